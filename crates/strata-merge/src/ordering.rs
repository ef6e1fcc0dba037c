//! Deterministic coordinate ordering of a single array

use strata_core::{find_threshold_coordinate, names, LabelledArray, StrataError, StrataResult};
use tracing::warn;

/// Reorder the axis of the named coordinate so its points ascend (or descend)
///
/// Every coordinate attached to that axis is permuted with it. Sorting a
/// circular coordinate is allowed but logged, since the wrap point makes the
/// result ambiguous.
pub fn sort_by_coordinate(
    array: &LabelledArray,
    coord_name: &str,
    descending: bool,
) -> StrataResult<LabelledArray> {
    let coord = array.coord(coord_name)?;
    if coord.circular {
        warn!(
            coord = %coord_name,
            "The {} coordinate is circular. If the values in the array span a boundary, \
             the sorting may not be appropriate.",
            coord_name
        );
    }
    let axis = match array.coord_dims(coord_name)?.as_slice() {
        // scalar coordinates have nothing to sort
        [] => return Ok(array.clone()),
        [axis] => *axis,
        _ => {
            return Err(StrataError::Coordinate(format!(
                "cannot sort by multi-dimensional coordinate {}",
                coord_name
            )))
        }
    };

    let mut order: Vec<usize> = (0..coord.len()).collect();
    order.sort_by(|&a, &b| coord.points[a].total_cmp(&coord.points[b]));
    if descending {
        order.reverse();
    }
    if order.iter().enumerate().all(|(i, &o)| i == o) {
        return Ok(array.clone());
    }
    array.take(axis, &order)
}

/// Move the named dimensions to the front (or the back) of the array
///
/// `"threshold"` is resolved to whichever coordinate marks thresholds and is
/// skipped if the array has none. Names that are not dimension coordinates
/// are ignored. The array is only transposed when the order changes.
pub fn enforce_coordinate_order(
    array: &mut LabelledArray,
    coord_names: &[&str],
    anchor_start: bool,
) -> StrataResult<()> {
    let mut resolved: Vec<String> = Vec::with_capacity(coord_names.len());
    for &name in coord_names {
        let name = if name == names::THRESHOLD {
            match find_threshold_coordinate(array) {
                Ok(coord) => coord.name.clone(),
                Err(_) => continue,
            }
        } else {
            name.to_string()
        };
        if array.is_dim_coord(&name) && !resolved.contains(&name) {
            resolved.push(name);
        }
    }

    let mut anchored = Vec::with_capacity(resolved.len());
    for name in &resolved {
        if let Some(axis) = array.dim_of(name) {
            anchored.push(axis);
        }
    }
    let remaining: Vec<usize> = (0..array.ndim()).filter(|a| !anchored.contains(a)).collect();
    let order: Vec<usize> = if anchor_start {
        anchored.iter().chain(&remaining).copied().collect()
    } else {
        remaining.iter().chain(&anchored).copied().collect()
    };

    if order.iter().enumerate().any(|(i, &a)| i != a) {
        array.transpose(&order)?;
    }
    Ok(())
}
