//! Array engine capability
//!
//! Storage-level work (statistical aggregation, constraint slicing,
//! combination of compatible arrays, coordinate-layout checks) is injected
//! through [`ArrayEngine`], so reconciliation logic can run against any
//! implementation. [`NdArrayEngine`] is the ndarray-backed reference engine.

mod aggregate;
mod combine;
mod nd;

use std::fmt;
use std::str::FromStr;

pub use nd::NdArrayEngine;

use crate::{LabelledArray, StrataError, StrataResult};

/// Statistical aggregation applied when collapsing a coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregator {
    Sum,
    Mean,
    Median,
    StdDev,
    Min,
    Max,
}

impl Aggregator {
    pub const NAMES: [&'static str; 6] = ["sum", "mean", "median", "std_dev", "min", "max"];

    pub fn all() -> &'static [Aggregator] {
        &[
            Aggregator::Sum,
            Aggregator::Mean,
            Aggregator::Median,
            Aggregator::StdDev,
            Aggregator::Min,
            Aggregator::Max,
        ]
    }

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Mean => "mean",
            Aggregator::Median => "median",
            Aggregator::StdDev => "std_dev",
            Aggregator::Min => "min",
            Aggregator::Max => "max",
        }
    }

    /// Name recorded in the cell method of a collapsed array
    pub fn cell_method(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Mean => "mean",
            Aggregator::Median => "median",
            Aggregator::StdDev => "standard_deviation",
            Aggregator::Min => "minimum",
            Aggregator::Max => "maximum",
        }
    }

    /// Whether the reference engine computes this in escalated precision
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            Aggregator::Mean | Aggregator::Median | Aggregator::StdDev
        )
    }
}

impl FromStr for Aggregator {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregator::all()
            .iter()
            .find(|a| a.name() == s)
            .copied()
            .ok_or_else(|| StrataError::UnknownAggregator {
                name: s.to_string(),
                expected: Aggregator::NAMES.to_vec(),
            })
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage-level operations on labelled arrays
pub trait ArrayEngine {
    /// Reduce along the named dimension coordinates
    fn collapse(
        &self,
        array: &LabelledArray,
        coords: &[&str],
        aggregator: Aggregator,
    ) -> StrataResult<LabelledArray>;

    /// Keep the parts of `array` whose `coord` points satisfy `predicate`
    ///
    /// Returns `None` when nothing matches.
    fn extract(
        &self,
        array: &LabelledArray,
        coord: &str,
        predicate: &dyn Fn(f64) -> bool,
    ) -> StrataResult<Option<LabelledArray>>;

    /// One array per point of `coord`
    fn slices_over(&self, array: &LabelledArray, coord: &str) -> StrataResult<Vec<LabelledArray>>;

    /// One array per index combination of the axes not spanned by `keep`
    fn slices(&self, array: &LabelledArray, keep: &[&str]) -> StrataResult<Vec<LabelledArray>>;

    /// Combine compatible arrays into one
    fn merge(&self, arrays: Vec<LabelledArray>) -> StrataResult<LabelledArray>;

    /// Bring `result` into the coordinate layout of `original`
    fn check_coordinates(
        &self,
        original: &LabelledArray,
        result: LabelledArray,
    ) -> StrataResult<LabelledArray>;
}

impl<E: ArrayEngine + ?Sized> ArrayEngine for &E {
    fn collapse(
        &self,
        array: &LabelledArray,
        coords: &[&str],
        aggregator: Aggregator,
    ) -> StrataResult<LabelledArray> {
        (**self).collapse(array, coords, aggregator)
    }

    fn extract(
        &self,
        array: &LabelledArray,
        coord: &str,
        predicate: &dyn Fn(f64) -> bool,
    ) -> StrataResult<Option<LabelledArray>> {
        (**self).extract(array, coord, predicate)
    }

    fn slices_over(&self, array: &LabelledArray, coord: &str) -> StrataResult<Vec<LabelledArray>> {
        (**self).slices_over(array, coord)
    }

    fn slices(&self, array: &LabelledArray, keep: &[&str]) -> StrataResult<Vec<LabelledArray>> {
        (**self).slices(array, keep)
    }

    fn merge(&self, arrays: Vec<LabelledArray>) -> StrataResult<LabelledArray> {
        (**self).merge(arrays)
    }

    fn check_coordinates(
        &self,
        original: &LabelledArray,
        result: LabelledArray,
    ) -> StrataResult<LabelledArray> {
        (**self).check_coordinates(original, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_from_str() {
        assert_eq!("std_dev".parse::<Aggregator>().unwrap(), Aggregator::StdDev);
        assert_eq!("max".parse::<Aggregator>().unwrap(), Aggregator::Max);
        match "mode".parse::<Aggregator>() {
            Err(StrataError::UnknownAggregator { name, expected }) => {
                assert_eq!(name, "mode");
                assert_eq!(expected.len(), 6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_aggregator_names_round_trip() {
        for agg in Aggregator::all() {
            assert_eq!(agg.name().parse::<Aggregator>().unwrap(), *agg);
        }
    }
}
