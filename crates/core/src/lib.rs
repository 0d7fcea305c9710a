//! Kolo Core - Domain types
//!
//! This crate contains the fundamental types used across Kolo:
//! - `Amount`: Non-negative decimal wrapper for money amounts

pub mod amount;

pub use amount::{Amount, AmountError};
