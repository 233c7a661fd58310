//! Cross-module dead-function elimination over compact module summaries.
//!
//! Each module compile builds a [`summary::ModuleSummaryIndex`] describing
//! its functions (identified by MD5-derived GUIDs), their call-graph edges
//! classified by dispatch kind, and the virtual-method slots its witness
//! tables and vtables contribute. The index serializes to a compact binary
//! file ([`format`]). A cross-module step merges several such files
//! ([`merge`]), computes the transitively reachable set from the preserved
//! roots ([`liveness`]), and writes the annotated combined index back.
//! Each module compile then loads the combined index and prunes its dead
//! functions and dead table entries ([`eliminate`]).

pub mod bitstream;
pub mod eliminate;
pub mod error;
pub mod format;
pub mod guid;
pub mod indexer;
pub mod ir;
pub mod liveness;
pub mod merge;
pub mod summary;
pub mod yaml;

#[cfg(test)]
mod eliminate_tests;
#[cfg(test)]
mod liveness_tests;

pub use error::{Result, SummaryError};
pub use guid::{guid_from_unique_name, Guid};
pub use summary::{
    Call, CallKind, FunctionSummary, ModuleSummaryIndex, SlotKind, VirtualMethodSlot,
};
