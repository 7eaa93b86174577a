//! Change ledger entities.

pub mod model;
pub mod op;

pub use model::ChangeRecord;
pub use op::ChangeOp;
