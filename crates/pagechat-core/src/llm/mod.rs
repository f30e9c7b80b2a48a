//! Generation-side abstractions for pagechat.
//!
//! - `GenerationClient`: streaming text generator port
//! - `BoxGenerationClient`: object-safe wrapper for runtime selection
//! - `TokenBudgeter`: character-based size estimate and prefix truncation

pub mod box_client;
pub mod client;
pub mod token_budget;

pub use box_client::BoxGenerationClient;
pub use client::{GenerationClient, TextStream};
pub use token_budget::TokenBudgeter;
