//! In-memory policy and acknowledgement state.
//!
//! # Responsibility
//! - Own the ordered policy collection and the acknowledgement ledger.
//! - Keep the deletion undo slot consistent with both.
//!
//! # Invariants
//! - Deleting a policy cascades to every employee record.
//! - Undo replays a captured snapshot; it never re-derives state.

pub mod coverage;
pub mod ledger;
pub mod policy_store;
pub mod undo;
