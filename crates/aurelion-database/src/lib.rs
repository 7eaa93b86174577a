//! # aurelion-database
//!
//! PostgreSQL connection management and the repository implementations for
//! files and the change ledger. The `memory` feature adds an in-process
//! implementation of the same traits.

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
#[cfg(feature = "memory")]
pub use memory::MemoryDatabase;
pub use repositories::{ChangeLedger, FileRepository, PgChangeLedger, PgFileRepository};
