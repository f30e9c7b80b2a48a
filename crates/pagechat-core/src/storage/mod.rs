//! Key-value storage abstraction for pagechat.
//!
//! Defines the asynchronous store every persistent piece of state goes
//! through, plus an in-memory implementation. The file-backed store lives in
//! pagechat-infra.

pub mod kv_store;
pub mod memory;

pub use kv_store::KvStore;
pub use memory::MemoryKvStore;
