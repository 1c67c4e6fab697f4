//! Shared foundational types used across the autosch schematic engine.
//!
//! This crate provides the internal-error result type and the stable content
//! hashing used for net styling and layout fingerprints.

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::{stable_hash, ContentHash};
pub use result::{AutoschResult, InternalError};
