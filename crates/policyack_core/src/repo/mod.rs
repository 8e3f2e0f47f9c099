//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract consumed by the persistence gateway.
//! - Isolate SQLite query details from service orchestration.

pub mod kv_repo;
