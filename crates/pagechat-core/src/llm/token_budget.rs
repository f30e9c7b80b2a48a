//! Token budget enforcement for page content.
//!
//! Sizes are estimated from character counts alone (no model call), and
//! oversized text is cut to a prefix. There is no attempt to cut on word or
//! sentence boundaries.

use pagechat_types::config::AppConfig;
use pagechat_types::content::TruncationResult;

/// Default characters-per-token ratio.
pub const CHARS_PER_TOKEN: u32 = 4;

/// Default input budget, in tokens.
pub const MAX_TOKENS: u32 = 1_048_576;

/// Estimates token counts and trims text to fit a fixed budget.
///
/// Lengths are counted in Unicode scalar values, so a cut never lands inside
/// a multi-byte character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudgeter {
    chars_per_token: u32,
    max_tokens: u32,
}

impl TokenBudgeter {
    /// Create a budgeter. A zero ratio is bumped to 1.
    pub fn new(chars_per_token: u32, max_tokens: u32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
            max_tokens,
        }
    }

    /// Derive a budgeter from application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.chars_per_token, config.max_input_tokens)
    }

    pub fn chars_per_token(&self) -> u32 {
        self.chars_per_token
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// `ceil(chars / chars_per_token)`.
    pub fn estimate(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        chars.div_ceil(u64::from(self.chars_per_token))
    }

    /// Fit `text` into `max_tokens`.
    ///
    /// Within budget the text comes back unchanged at 100%. Otherwise the
    /// first `max_tokens * chars_per_token` characters are kept and the
    /// percentage is `floor(kept * 100 / original)`.
    pub fn truncate(&self, text: &str, max_tokens: u32) -> TruncationResult {
        if self.estimate(text) <= u64::from(max_tokens) {
            return TruncationResult {
                text: text.to_string(),
                percentage_kept: 100,
            };
        }

        let original_len = text.chars().count() as u64;
        let chars_to_keep = u64::from(max_tokens) * u64::from(self.chars_per_token);

        let cut = text
            .char_indices()
            .nth(chars_to_keep as usize)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());

        let percentage_kept = if original_len == 0 {
            100
        } else {
            (chars_to_keep * 100 / original_len).min(100) as u8
        };

        TruncationResult {
            text: text[..cut].to_string(),
            percentage_kept,
        }
    }

    /// [`truncate`](Self::truncate) against the configured budget.
    pub fn fit(&self, text: &str) -> TruncationResult {
        self.truncate(text, self.max_tokens)
    }
}

impl Default for TokenBudgeter {
    fn default() -> Self {
        Self::new(CHARS_PER_TOKEN, MAX_TOKENS)
    }
}
