//! Strata Merge - Reconciliation and merging of labelled arrays
//!
//! This crate implements the reconciliation pipeline:
//! - Metadata reconciliation (attribute and coordinate diffing, copying)
//! - Coordinate ordering
//! - Bounds expansion and consistency checks
//! - The merge engine
//! - Axis insertion
//! - Vertical reduction
//! - Realization recycling and filtering
//! - Bounded reduction and clipping

pub mod axis;
pub mod bounds;
pub mod membership;
pub mod merge;
pub mod ordering;
pub mod reconcile;
pub mod reduction;
pub mod vertical;

pub use axis::*;
pub use bounds::*;
pub use membership::*;
pub use merge::*;
pub use ordering::*;
pub use reconcile::*;
pub use reduction::*;
pub use vertical::*;
