//! Strata Test Harness - Fixtures and instrumentation
//!
//! This crate provides:
//! - A builder for labelled array fixtures
//! - Seeded random ensemble generation
//! - A recording engine that logs every array-engine call
//! - Capture of emitted diagnostics
//! - End-to-end merge scenarios

pub mod ensemble;
pub mod fixtures;
pub mod integration;
pub mod logs;
pub mod recording;

#[cfg(test)]
mod properties;

pub use ensemble::*;
pub use fixtures::*;
pub use integration::*;
pub use logs::*;
pub use recording::*;
