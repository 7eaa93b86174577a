//! # aurelion-storage
//!
//! Byte-level storage for Aurelion: the local filesystem provider, the
//! content-addressed path layout, checksum computation, thumbnail
//! transcoders, and the streaming zip archive writer.

pub mod archive;
pub mod checksum;
pub mod layout;
pub mod providers;
pub mod thumbnail;

pub use archive::{ArchiveEntry, ArchiveState, ArchiveStream};
pub use checksum::compute_checksum;
pub use providers::LocalStorageProvider;
