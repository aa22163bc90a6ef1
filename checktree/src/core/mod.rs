//! Deterministic result model and tree copying.
//!
//! Core modules perform no I/O and never await. They operate on in-memory data
//! and are exercised directly by unit tests; the async scheduler drives them.

pub mod aggregate;
pub mod cloner;
pub mod outcome;
pub mod report;
