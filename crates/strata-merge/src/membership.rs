//! Realization recycling and filtering

use strata_core::{names, not_found, ArrayEngine, LabelledArray, StrataError, StrataResult};
use tracing::debug;

use crate::merge::{MergeEngine, MergeOptions};

/// Extend or shorten the realization dimension to `count` members
///
/// Members are recycled in order (`1, 2, 3, 1, 2, ...`) and renumbered
/// consecutively from the first member's identifier. Fewer members than
/// present keeps the first `count`.
pub fn resample_membership<E: ArrayEngine>(
    merger: &MergeEngine<E>,
    array: &LabelledArray,
    count: usize,
) -> StrataResult<LabelledArray> {
    if !array.is_dim_coord(names::REALIZATION) {
        return Err(StrataError::InvalidInput(format!(
            "Input array does not contain realizations. The following dimension coordinates were found: {:?}",
            array.dim_coord_names()
        )));
    }
    let realization = array.coord(names::REALIZATION)?;
    if realization.len() == count {
        return Ok(array.clone());
    }

    let points = &realization.points;
    if points.is_empty() {
        return Err(StrataError::InvalidInput(
            "Cannot recycle an empty realization dimension".to_string(),
        ));
    }
    let selected: Vec<f64> = (0..count).map(|k| points[k % points.len()]).collect();
    let Some(&first) = selected.first() else {
        return Err(StrataError::InvalidInput(
            "Cannot resample to zero realizations".to_string(),
        ));
    };
    debug!(
        from = points.len(),
        to = count,
        "Recycling realizations"
    );

    let engine = merger.engine();
    let mut members = Vec::with_capacity(count);
    for (k, &id) in selected.iter().enumerate() {
        let mut member = engine
            .extract(array, names::REALIZATION, &|r| r == id)?
            .ok_or_else(|| not_found(names::REALIZATION))?;
        let coord = member.coord_mut(names::REALIZATION)?;
        coord.points = vec![coord.dtype.cast(first + k as f64)];
        coord.bounds = None;
        members.push(member);
    }
    merger.merge_with(&mut members, &MergeOptions::membership())
}

/// Merge `arrays`, keeping only the realizations present at every time
///
/// The full set of times is gathered across all inputs. Each realization is
/// merged on its own and discarded if any of those times is missing; the
/// surviving realizations are then merged together.
pub fn filter_to_common_times<E: ArrayEngine>(
    merger: &MergeEngine<E>,
    arrays: &[LabelledArray],
) -> StrataResult<LabelledArray> {
    let mut times = Vec::new();
    let mut realizations = Vec::new();
    for array in arrays {
        times.extend_from_slice(&array.coord(names::TIME)?.points);
        realizations.extend_from_slice(&array.coord(names::REALIZATION)?.points);
    }
    let times = distinct(times);
    let realizations = distinct(realizations);

    let engine = merger.engine();
    let mut kept = Vec::with_capacity(realizations.len());
    for &realization in &realizations {
        let mut members = Vec::with_capacity(arrays.len());
        for array in arrays {
            if let Some(member) = engine.extract(array, names::REALIZATION, &|r| r == realization)? {
                members.push(member);
            }
        }
        let merged = merger.merge(&mut members)?;
        let member_times = distinct(merged.coord(names::TIME)?.points.clone());
        if member_times == times {
            kept.push(merged);
        } else {
            debug!(realization, "Discarding realization missing from some times");
        }
    }
    merger.merge(&mut kept)
}

/// Sorted unique values
fn distinct(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}
