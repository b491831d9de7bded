//! Core types for FlipLedger.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod status;

pub use id::*;
pub use price::{CurrencyCode, MAX_MONEY, MONEY_SCALE, Price};
pub use status::*;
