//! Cross-context messaging: the dispatch facade and its handlers.
//!
//! - `transport` -- `Transport` port and `send_to_all_active_tabs`
//! - `handler` -- `MessageHandler` trait, boxing wrapper, concrete handlers
//! - `dispatcher` -- `MessageDispatcher` routing by `MessageKind`
//! - `background` -- background-context entry points feeding the dispatcher
//! - `receiver` -- content-context receiver applying messages to sidebar state

pub mod background;
pub mod dispatcher;
pub mod handler;
pub mod receiver;
pub mod transport;

pub use background::BackgroundRuntime;
pub use dispatcher::MessageDispatcher;
pub use handler::{BoxMessageHandler, IconClickHandler, MessageHandler, ThemeChangeHandler};
pub use receiver::{ContentReceiver, SidebarView};
pub use transport::{Transport, send_to_all_active_tabs};
