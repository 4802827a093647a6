//! # recsync testkit
//!
//! Test utilities for recsync.
//!
//! This crate provides:
//! - A ready-made reconciliation scenario over in-memory stores
//! - Property-based test generators using proptest
//! - Concurrent pass helpers for race testing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recsync_testkit::prelude::*;
//!
//! #[test]
//! fn cleans_stale_rows() {
//!     let scenario = Scenario::new();
//!     scenario.add_remote(json!({"id": "a001", "object_type": CUSTOM_OBJECT}));
//!     // ... run passes
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use serde_json::json;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
