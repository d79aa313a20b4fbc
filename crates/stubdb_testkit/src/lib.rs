//! # StubDB Testkit
//!
//! Test utilities for StubDB.
//!
//! This crate provides:
//! - Test fixtures and populated datastore scenarios
//! - Property-based test generators using proptest
//! - A model-checking harness comparing the datastore with a reference model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stubdb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_datastore() {
//!     let ds = scenarios::abc_datastore();
//!     assert_eq!(ds.len(), 3);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
