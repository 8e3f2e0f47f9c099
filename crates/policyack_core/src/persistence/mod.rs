//! Durable state hydration and persistence.
//!
//! # Responsibility
//! - Map in-memory collections to JSON records in the key/value store.
//! - Repair or replace damaged persisted state on load.
//!
//! # See also
//! - `repo::kv_repo` for the storage contract.

pub mod gateway;
pub mod record;
