//! Merge engine
//!
//! Combines N compatible arrays into one. Before delegating the actual
//! combination to the injected [`ArrayEngine`], the working set is reconciled:
//! - attributes are equalised (silent attributes dropped),
//! - variable names are stripped (except the threshold marker),
//! - cell methods are reduced to those shared by every array.

use strata_core::{names, ArrayEngine, LabelledArray, NdArrayEngine, StrataError, StrataResult};

use crate::bounds::check_time_bounds_ranges;
use crate::reconcile::{equalise_attributes, equalise_cell_methods, strip_var_names};

/// Merge configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// Refuse results whose time or forecast-period bounds differ in width
    pub check_time_bounds: bool,
    /// Split inputs into one array per realization before merging
    pub slice_over_membership: bool,
    /// Work on copies so the caller's arrays are left untouched
    pub copy: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            check_time_bounds: false,
            slice_over_membership: false,
            copy: true,
        }
    }
}

impl MergeOptions {
    /// Merging accumulations: bound widths must agree
    pub fn accumulation() -> Self {
        MergeOptions {
            check_time_bounds: true,
            ..MergeOptions::default()
        }
    }

    /// Merging realizations that may interleave
    pub fn membership() -> Self {
        MergeOptions {
            slice_over_membership: true,
            ..MergeOptions::default()
        }
    }

    /// Reconcile the caller's arrays in place
    pub fn in_place() -> Self {
        MergeOptions {
            copy: false,
            ..MergeOptions::default()
        }
    }
}

/// What to merge: one array, or a sequence of arrays
#[derive(Debug)]
pub enum MergeInput<'a> {
    Single(LabelledArray),
    Many(&'a mut [LabelledArray]),
}

impl From<LabelledArray> for MergeInput<'_> {
    fn from(array: LabelledArray) -> Self {
        MergeInput::Single(array)
    }
}

impl<'a> From<&'a mut [LabelledArray]> for MergeInput<'a> {
    fn from(arrays: &'a mut [LabelledArray]) -> Self {
        MergeInput::Many(arrays)
    }
}

impl<'a> From<&'a mut Vec<LabelledArray>> for MergeInput<'a> {
    fn from(arrays: &'a mut Vec<LabelledArray>) -> Self {
        MergeInput::Many(arrays.as_mut_slice())
    }
}

/// Merge engine
pub struct MergeEngine<E: ArrayEngine = NdArrayEngine> {
    engine: E,
    options: MergeOptions,
}

impl MergeEngine<NdArrayEngine> {
    pub fn new() -> Self {
        Self::with_config(MergeOptions::default())
    }

    pub fn with_config(options: MergeOptions) -> Self {
        MergeEngine {
            engine: NdArrayEngine::new(),
            options,
        }
    }
}

impl Default for MergeEngine<NdArrayEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ArrayEngine> MergeEngine<E> {
    /// Merge through a caller-supplied array engine
    pub fn with_engine(engine: E, options: MergeOptions) -> Self {
        MergeEngine { engine, options }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge with the configured options
    pub fn merge<'a>(&self, input: impl Into<MergeInput<'a>>) -> StrataResult<LabelledArray> {
        self.merge_with(input, &self.options)
    }

    /// Merge with options for this call only
    pub fn merge_with<'a>(
        &self,
        input: impl Into<MergeInput<'a>>,
        options: &MergeOptions,
    ) -> StrataResult<LabelledArray> {
        let arrays = match input.into() {
            MergeInput::Single(array) => return Ok(array),
            MergeInput::Many(arrays) => arrays,
        };
        match &*arrays {
            [] => {
                return Err(StrataError::InvalidInput(
                    "Expected at least one array to merge".to_string(),
                ))
            }
            [array] => {
                if options.check_time_bounds {
                    check_time_bounds_ranges(array)?;
                }
                return Ok(array.clone());
            }
            _ => {}
        }

        let working = if options.slice_over_membership {
            let mut slices = self.slice_over_membership(arrays)?;
            reconcile(&mut slices);
            slices
        } else if options.copy {
            let mut copies = arrays.to_vec();
            reconcile(&mut copies);
            copies
        } else {
            reconcile(arrays);
            arrays.to_vec()
        };

        let result = self.engine.merge(working)?;
        if options.check_time_bounds {
            check_time_bounds_ranges(&result)?;
        }
        Ok(result)
    }

    /// One array per realization, for every input carrying that coordinate
    fn slice_over_membership(&self, arrays: &[LabelledArray]) -> StrataResult<Vec<LabelledArray>> {
        let mut slices = Vec::with_capacity(arrays.len());
        for array in arrays {
            if array.has_coord(names::REALIZATION) {
                slices.extend(self.engine.slices_over(array, names::REALIZATION)?);
            } else {
                slices.push(array.clone());
            }
        }
        Ok(slices)
    }
}

/// Remove metadata differences that would block a merge
fn reconcile(arrays: &mut [LabelledArray]) {
    equalise_attributes(arrays);
    strip_var_names(arrays);
    equalise_cell_methods(arrays);
}
