//! File content services.

pub mod store;
pub mod stream;

pub use store::{ContentStore, UploadParams};
pub use stream::{RangeRead, RangeReader};
