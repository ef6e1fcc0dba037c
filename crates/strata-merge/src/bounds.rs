//! Bounds algebra: interval union across contributing arrays

use strata_core::{names, LabelledArray, StrataError, StrataResult, FLOAT_DTYPE};

/// Relative tolerance used when comparing bound widths
const WIDTH_RTOL: f64 = 1.0e-5;
/// Absolute tolerance used when comparing bound widths
const WIDTH_ATOL: f64 = 1.0e-8;

/// Widen the single-point coordinates of `target` to span every contributor
///
/// For each name the target coordinate must hold exactly one point. Its bound
/// becomes `[min lower, max upper]` over the contributors' bounds, or over
/// their points when none of them is bounded, and its point moves to the new
/// upper bound. A mixture of bounded and unbounded contributors is refused.
pub fn expand_bounds<'a>(
    target: &'a mut LabelledArray,
    contributors: &[LabelledArray],
    coord_names: &[&str],
) -> StrataResult<&'a mut LabelledArray> {
    for &name in coord_names {
        let points = target.coord(name)?.len();
        if points != 1 {
            return Err(StrataError::InvalidInput(format!(
                "Expected to find exactly 1 {} point, found {}",
                name, points
            )));
        }

        let coords = contributors
            .iter()
            .map(|array| array.coord(name))
            .collect::<StrataResult<Vec<_>>>()?;
        let bounded = coords.iter().filter(|c| c.has_bounds()).count();
        if bounded != 0 && bounded != coords.len() {
            return Err(StrataError::MixedBounds(name.to_string()));
        }
        let mut lower = f64::INFINITY;
        let mut upper = f64::NEG_INFINITY;
        for coord in &coords {
            if let Some([lo, hi]) = coord.envelope() {
                lower = lower.min(lo);
                upper = upper.max(hi);
            }
        }
        if !lower.is_finite() || !upper.is_finite() {
            return Err(StrataError::InvalidInput(format!(
                "No {} values to expand bounds from",
                name
            )));
        }

        let coord = target.coord_mut(name)?;
        let dtype = if coord.dtype.is_float() {
            FLOAT_DTYPE
        } else {
            coord.dtype
        };
        coord.bounds = Some(vec![[lower, upper]]);
        coord.points = vec![upper];
        coord.cast(dtype);
    }
    Ok(target)
}

/// Refuse arrays whose time or forecast-period bounds span different widths
///
/// Blending a 1 hour accumulation with a 3 hour one would silently produce a
/// meaningless result, so every bound interval of a multi-point bounded
/// coordinate must match the first one in width.
pub fn check_time_bounds_ranges(array: &LabelledArray) -> StrataResult<()> {
    for name in [names::TIME, names::FORECAST_PERIOD] {
        let Some(coord) = array.find_coord(name) else {
            continue;
        };
        let Some(bounds) = &coord.bounds else {
            continue;
        };
        if coord.len() <= 1 {
            continue;
        }
        let widths: Vec<f64> = bounds.iter().map(|[lo, hi]| (hi - lo).abs()).collect();
        let reference = widths[0];
        if !widths.iter().all(|&w| is_close(w, reference)) {
            return Err(StrataError::MismatchedBounds(name.to_string()));
        }
    }
    Ok(())
}

#[inline]
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= WIDTH_ATOL + WIDTH_RTOL * b.abs()
}
