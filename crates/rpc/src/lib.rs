//! Kolo RPC - CLI orchestrator
//!
//! This crate provides the CLI binary and command orchestration.

pub mod commands;
pub mod context;

pub use context::{AppContext, BreakSettlement};
