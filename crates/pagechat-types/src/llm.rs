//! Generation-side types: errors from the streaming client and the
//! output-language parameter threaded into prompts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from the generation client.
///
/// The display text ends up verbatim in the chat as part of the inline
/// error message, so variants carrying a provider message print it bare.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Stream(String),

    #[error("malformed response: {0}")]
    Deserialization(String),

    #[error("the API key was rejected")]
    AuthenticationFailed,

    #[error("rate limited, try again later")]
    RateLimited,

    #[error("generation cancelled")]
    Cancelled,
}

/// A selectable output language: wire code plus display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages offered to the user. `auto` keeps the document's language.
pub const SUPPORTED_LANGUAGES: &[LanguageOption] = &[
    LanguageOption { code: "auto", name: "Auto (same as document)" },
    LanguageOption { code: "en", name: "English" },
    LanguageOption { code: "es", name: "Spanish" },
    LanguageOption { code: "fr", name: "French" },
    LanguageOption { code: "de", name: "German" },
    LanguageOption { code: "it", name: "Italian" },
    LanguageOption { code: "pt", name: "Portuguese" },
    LanguageOption { code: "zh", name: "Chinese" },
    LanguageOption { code: "ja", name: "Japanese" },
    LanguageOption { code: "ko", name: "Korean" },
    LanguageOption { code: "ru", name: "Russian" },
    LanguageOption { code: "ar", name: "Arabic" },
];

/// Language the model must answer in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum OutputLanguage {
    /// Answer in the same language as the source document.
    #[default]
    Auto,
    /// Answer in exactly this language, whatever the source is written in.
    Language(String),
}

impl OutputLanguage {
    /// Resolve a language code (`"auto"`, `"es"`, ...). Codes outside
    /// [`SUPPORTED_LANGUAGES`] are taken as a language name verbatim.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if code.is_empty() || code.eq_ignore_ascii_case("auto") {
            return OutputLanguage::Auto;
        }
        let name = SUPPORTED_LANGUAGES
            .iter()
            .find(|opt| opt.code.eq_ignore_ascii_case(code))
            .map(|opt| opt.name.to_string())
            .unwrap_or_else(|| code.to_string());
        OutputLanguage::Language(name)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, OutputLanguage::Auto)
    }

    /// Phrase used inside the prompt.
    pub fn describe(&self) -> &str {
        match self {
            OutputLanguage::Auto => "the same language as the document",
            OutputLanguage::Language(name) => name,
        }
    }

    /// Short code for display and config round-trips.
    pub fn code(&self) -> String {
        match self {
            OutputLanguage::Auto => "auto".to_string(),
            OutputLanguage::Language(name) => SUPPORTED_LANGUAGES
                .iter()
                .find(|opt| opt.name == name)
                .map(|opt| opt.code.to_string())
                .unwrap_or_else(|| name.clone()),
        }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl FromStr for OutputLanguage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OutputLanguage::from_code(s))
    }
}

impl From<String> for OutputLanguage {
    fn from(code: String) -> Self {
        OutputLanguage::from_code(&code)
    }
}

impl From<OutputLanguage> for String {
    fn from(lang: OutputLanguage) -> Self {
        lang.code()
    }
}
