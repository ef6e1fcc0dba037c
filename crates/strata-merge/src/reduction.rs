//! Provenance-preserving reduction and value clipping

use strata_core::{
    names, Aggregator, ArrayEngine, CoordAxis, LabelledArray, StrataError, StrataResult,
    FLOAT_DTYPE,
};

/// Collapse `coords` with `aggregator`, keeping the array's own cell methods
///
/// Floating payloads and the collapsed coordinates are brought back to the
/// declared float precision if the engine escalated them.
pub fn reduce<E: ArrayEngine + ?Sized>(
    engine: &E,
    array: &LabelledArray,
    coords: &[&str],
    aggregator: Aggregator,
) -> StrataResult<LabelledArray> {
    let mut result = engine.collapse(array, coords, aggregator)?;
    result.metadata.cell_methods = array.cell_methods().to_vec();

    if result.dtype.is_float() {
        result.cast_data(result.dtype.demoted());
    }
    for &name in coords {
        let coord = result.coord_mut(name)?;
        if coord.dtype.is_float() {
            coord.cast(FLOAT_DTYPE);
        }
    }
    Ok(result)
}

/// Collapse the realization dimension and drop its coordinate
///
/// The standard deviation of a single member is undefined: its values are
/// set to NaN so the result is unambiguous without inspecting the mask.
pub fn reduce_membership<E: ArrayEngine + ?Sized>(
    engine: &E,
    array: &LabelledArray,
    aggregator: Aggregator,
) -> StrataResult<LabelledArray> {
    let members = array.coord(names::REALIZATION)?.len();
    let mut result = reduce(engine, array, &[names::REALIZATION], aggregator)?;
    result.remove_coord(names::REALIZATION)?;

    if aggregator == Aggregator::StdDev && members == 1 {
        result.data.fill(f64::NAN);
    }
    Ok(result)
}

/// [`reduce_membership`] with the aggregator given by name
pub fn reduce_membership_by_name<E: ArrayEngine + ?Sized>(
    engine: &E,
    array: &LabelledArray,
    method: &str,
) -> StrataResult<LabelledArray> {
    reduce_membership(engine, array, method.parse()?)
}

/// Clip every horizontal slice of `array` into `[minimum, maximum]`
///
/// Clipped values are rounded through the payload precision. Attributes and
/// cell methods lost while reassembling the slices are restored, and the
/// result is checked against the original coordinate layout.
pub fn clip_values<E: ArrayEngine + ?Sized>(
    engine: &E,
    array: &LabelledArray,
    minimum: f64,
    maximum: f64,
) -> StrataResult<LabelledArray> {
    if !(minimum <= maximum) {
        return Err(StrataError::InvalidInput(format!(
            "Clip range [{}, {}] is empty",
            minimum, maximum
        )));
    }
    let y = horizontal_coord(array, CoordAxis::Y)?;
    let x = horizontal_coord(array, CoordAxis::X)?;

    let dtype = array.dtype;
    let mut slices = engine.slices(array, &[y.as_str(), x.as_str()])?;
    for slice in slices.iter_mut() {
        slice
            .data
            .mapv_inplace(|v| dtype.cast(v.clamp(minimum, maximum)));
    }

    let mut result = engine.merge(slices)?;
    result.metadata.attributes = array.attributes().clone();
    result.metadata.cell_methods = array.cell_methods().to_vec();
    engine.check_coordinates(array, result)
}

/// Name of the coordinate describing a horizontal axis
fn horizontal_coord(array: &LabelledArray, axis: CoordAxis) -> StrataResult<String> {
    array
        .coords()
        .find(|c| c.axis() == Some(axis))
        .map(|c| c.name.clone())
        .ok_or_else(|| StrataError::CoordinateNotFound(format!("{:?} axis coordinate", axis)))
}
