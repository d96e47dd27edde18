//! # Mangrove Schema
//!
//! Request/response schema validation and wire-casing conversion for axum
//! routes:
//!
//! | Item | Role |
//! |------|------|
//! | [`SchemaConfig`] | Pipeline configuration, threaded explicitly |
//! | [`Validated<T>`] / [`ValidatedForm<T>`] | Request-body validation (400 on mismatch) |
//! | [`ResponseRules`] + [`ValidateResponse`] | Per-route response validation (500 on mismatch) |
//! | [`casing`] | Pure snake_case ↔ camelCase key renaming |
//!
//! A decorated invocation runs request validation before the handler and
//! response validation after it; statuses without a registered model pass
//! through untouched.

pub mod casing;
mod config;
mod request;
mod response;

pub use config::SchemaConfig;
pub use request::{Validated, ValidatedForm};
pub use response::{ResponseRules, ValidateResponse, ValidateResponseService};
