//! Persistent key-value storage.

pub mod json_file;

pub use json_file::JsonFileKvStore;
