//! CodeGauge Core
//!
//! Foundational error types for the CodeGauge workspace. This crate has zero
//! dependencies on application-level code (CLI, pass catalogs, report
//! rendering) and only pulls in thiserror + serde_json.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies** - keeps build times low for downstream crates
//! 2. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};
