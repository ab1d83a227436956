//! Daily-order session logic: today's order message, the reaction alphabet,
//! the deadline gate and the append-only ledger, all written against the
//! chat and sheet seams in `ports`.

pub mod clock;
pub mod deadline;
pub mod desk;
pub mod directory;
pub mod ledger;
pub mod ports;
pub mod reaction;
pub mod session;

pub use desk::{DeskOptions, DeskParts, OrderDesk, SkipReason, Verdict};
