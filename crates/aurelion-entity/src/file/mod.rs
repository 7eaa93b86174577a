//! File domain entities.

pub mod model;
pub mod snapshot;

pub use model::{File, NewFile};
pub use snapshot::FileSnapshot;
