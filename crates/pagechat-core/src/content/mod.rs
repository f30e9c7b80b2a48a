//! Page content loading.
//!
//! An extractor turns a location into raw text; [`load_page_content`] then
//! fits that text into the token budget. A page that cannot be read is
//! treated as empty so the chat still works without context.

use std::future::Future;

use pagechat_types::content::{ContentKind, PageContent};
use pagechat_types::error::ExtractError;
use tracing::{info, warn};

use crate::llm::TokenBudgeter;

/// Reads the visible text of a page or document.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, location: &str) -> impl Future<Output = Result<String, ExtractError>> + Send;
}

/// Extract `location` and fit the text into `budgeter`'s budget.
pub async fn load_page_content<E: ContentExtractor>(
    extractor: &E,
    budgeter: &TokenBudgeter,
    location: &str,
) -> PageContent {
    let kind = ContentKind::from_location(location);

    let raw = match extractor.extract(location).await {
        Ok(text) => text,
        Err(e) => {
            warn!(%location, %kind, error = %e, "content extraction failed, continuing without page text");
            return PageContent::empty(kind);
        }
    };

    let original_chars = raw.chars().count();
    let fitted = budgeter.fit(&raw);
    info!(
        %kind,
        chars = original_chars,
        estimated_tokens = budgeter.estimate(&raw),
        percentage_kept = fitted.percentage_kept,
        "page content loaded"
    );

    PageContent {
        kind,
        text: fitted.text,
        percentage_kept: fitted.percentage_kept,
        original_chars,
    }
}
