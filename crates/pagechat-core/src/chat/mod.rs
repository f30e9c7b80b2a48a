//! Per-page chat: session persistence, prompt assembly, and the turn engine.

pub mod engine;
pub mod prompt;
pub mod session_store;

pub use engine::{ChatEngine, ERROR_PREFIX, TurnOutcome, TurnState};
pub use prompt::{DEFAULT_REQUEST, PromptBuilder};
pub use session_store::SessionStore;
