//! Core traits defined in `aurelion-core` and implemented by other crates.

pub mod repository;
pub mod storage;

pub use repository::PendingWrite;
pub use storage::{ByteStream, StorageProvider};
