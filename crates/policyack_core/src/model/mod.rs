//! Domain model for policy versions and employee acknowledgements.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Provide the built-in seed dataset used as load fallback.
//!
//! # Invariants
//! - Policy ids are stable and never rewritten after allocation.
//! - An employee acknowledges a policy iff it holds a timestamp for it.

pub mod employee;
pub mod policy;
pub mod seed;
