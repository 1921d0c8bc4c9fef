//! # Board Log Testkit
//!
//! Testing utilities for the board log.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: RFC 6962 reference roots for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Initialized logs with deterministic keys
//!
//! ## Golden Vectors
//!
//! ```rust
//! use board_log_testkit::vectors::verify_tree_vectors;
//!
//! for (size, matches, root) in verify_tree_vectors() {
//!     assert!(matches, "{size}: {root}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use board_log_testkit::generators::batch_plan;
//!
//! proptest! {
//!     #[test]
//!     fn batching_does_not_change_the_root(plan in batch_plan(32)) {
//!         // integrate plan.batches() one by one, compare with one run
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use board_log::LogConfig;
//! use board_log_testkit::fixtures::{numbered_hashes, TestLog, TEST_ORIGIN};
//!
//! let fixture = TestLog::in_memory(LogConfig::new(TEST_ORIGIN)).unwrap();
//! fixture.sequence(&numbered_hashes(3)).unwrap();
//! assert_eq!(fixture.integrate().unwrap().size, 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{numbered_hashes, payload_for, TestLog, TEST_ORIGIN};
pub use generators::{batch_plan, distinct_hashes, entry_hash, BatchPlan};
pub use vectors::{tree_vectors, verify_tree_vectors, TreeVector};
