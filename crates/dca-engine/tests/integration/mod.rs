//! Integration tests for dca-engine.
//!
//! These tests drive the scheduler against in-memory collaborators:
//! - Manual cycles and their reports
//! - Time-based and signal-based trigger loops
//! - Stale order cancellation and failure isolation

pub mod common;
