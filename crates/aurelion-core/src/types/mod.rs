//! Core type definitions used across the Aurelion workspace.

pub mod hash;
pub mod id;
pub mod range;

pub use hash::ContentHash;
pub use id::UserId;
pub use range::{ByteRange, RangeRequest};
