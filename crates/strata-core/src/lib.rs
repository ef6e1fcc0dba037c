//! Strata Core - Labelled array model
//!
//! This crate defines the types every reconciliation step works on:
//! - Element precision (DType)
//! - Coordinates and their axes
//! - Array metadata (attributes, cell methods)
//! - The labelled array container
//! - The array engine capability and its ndarray reference engine

pub mod array;
pub mod coord;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod metadata;

pub use array::*;
pub use coord::*;
pub use dtype::*;
pub use engine::*;
pub use error::*;
pub use metadata::*;
