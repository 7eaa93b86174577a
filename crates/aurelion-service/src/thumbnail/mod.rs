//! Thumbnail derivation: the bounded worker pool and the batch pipeline.

pub mod pipeline;
pub mod pool;

pub use pipeline::{RenderedThumbnail, ThumbnailOutcome, ThumbnailPipeline};
pub use pool::BoundedPool;
