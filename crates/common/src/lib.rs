//! Common types and utilities for Volcrush
//!
//! This crate provides shared types and the text-input boundary used across
//! all Volcrush crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Gateway domain types (RequestId, Bar, Contract, etc.)
//! - [`parse`] - Validated parsing of user-entered numeric text

pub mod error;
pub mod parse;
pub mod types;

pub use error::{Error, Result};
pub use parse::{parse_days, parse_decimal, parse_port};
pub use types::*;
