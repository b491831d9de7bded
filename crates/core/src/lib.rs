//! FlipLedger Core - Shared types and record-level rules.
//!
//! This crate is used by:
//! - `dashboard` - The web dashboard and its persistence layer
//! - `cli` - Command-line tools for migrations, seeding and exports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Storage and presentation live in `dashboard`.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money and closed status enumerations
//! - [`calc`] - Profit, ROI, net profit and dispatch deadlines
//! - [`lifecycle`] - Status transition graphs and enforcement policy
//! - [`relations`] - Weak and owning references between records
//! - [`validation`] - Error taxonomy and form field parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod calc;
pub mod lifecycle;
pub mod relations;
pub mod types;
pub mod validation;

pub use lifecycle::{Lifecycle, Transition, TransitionPolicy};
pub use relations::{DeleteReport, EntityKind, RelationKind};
pub use types::*;
pub use validation::{ComputationError, FieldError, NotFoundError, ValidationError};
