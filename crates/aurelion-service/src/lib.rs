//! # aurelion-service
//!
//! Business logic service layer for Aurelion. Each service orchestrates the
//! repositories and storage providers to implement one use case: storing
//! content, fingerprinting a user's file set, guarding ownership, serving
//! the sync ledger, streaming byte ranges, and deriving thumbnails.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod digest;
pub mod file;
pub mod ownership;
pub mod sync;
pub mod thumbnail;

pub use context::RequestContext;
pub use digest::DigestService;
pub use file::{ContentStore, RangeRead, RangeReader, UploadParams};
pub use ownership::OwnershipGuard;
pub use sync::SyncService;
pub use thumbnail::{BoundedPool, RenderedThumbnail, ThumbnailOutcome, ThumbnailPipeline};
