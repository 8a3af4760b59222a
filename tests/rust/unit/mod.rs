//! Unit tests - public API behavior without any files or environment
//!
//! These tests drive the crate the way an embedding front end would.

mod dialect_override_tests;
mod query_tree_tests;
