//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, ledger, undo and persistence into user actions.
//! - Keep hosts decoupled from storage details.

pub mod notice;
pub mod policy_service;
