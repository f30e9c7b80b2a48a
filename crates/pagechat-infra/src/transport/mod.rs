//! In-process implementation of the cross-context transport.

pub mod tab_bus;

pub use tab_bus::{TabBus, TabEnvelope, spawn_responder};
