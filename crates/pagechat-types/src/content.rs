//! Page content as it is fed into a prompt.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the page text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Pdf,
    Webpage,
}

impl ContentKind {
    /// Classify a location: anything ending in `.pdf` (case-insensitive) is a PDF.
    pub fn from_location(location: &str) -> Self {
        if location.to_lowercase().ends_with(".pdf") {
            ContentKind::Pdf
        } else {
            ContentKind::Webpage
        }
    }

    /// Label used in prompts and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "PDF",
            ContentKind::Webpage => "webpage",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of fitting text into a token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationResult {
    pub text: String,
    /// Share of the original characters that survived, 0..=100.
    pub percentage_kept: u8,
}

impl TruncationResult {
    /// Whether anything was cut.
    pub fn is_truncated(&self) -> bool {
        self.percentage_kept < 100
    }
}

/// Extracted, budget-fitted text of the page the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub kind: ContentKind,
    pub text: String,
    pub percentage_kept: u8,
    /// Length of the extracted text before truncation, in characters.
    pub original_chars: usize,
}

impl PageContent {
    /// Content for a page whose text could not be read.
    pub fn empty(kind: ContentKind) -> Self {
        Self {
            kind,
            text: String::new(),
            percentage_kept: 100,
            original_chars: 0,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.percentage_kept < 100
    }
}
