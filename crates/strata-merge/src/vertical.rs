//! Vertical reduction over the height coordinate

use ndarray::Zip;
use strata_core::{names, Aggregator, ArrayEngine, LabelledArray, StrataError, StrataResult};

/// Maximum over the height levels within `[lower, upper]`, inclusive
///
/// A missing bound defaults to the lowest (or highest) level present. A
/// single level in range is passed through without collapsing.
pub fn maximum_in_range<E: ArrayEngine + ?Sized>(
    engine: &E,
    array: &LabelledArray,
    lower: Option<f64>,
    upper: Option<f64>,
    new_name: Option<&str>,
) -> StrataResult<LabelledArray> {
    let levels = &array.coord(names::HEIGHT)?.points;
    let lower = lower.unwrap_or_else(|| levels.iter().copied().fold(f64::INFINITY, f64::min));
    let upper = upper.unwrap_or_else(|| levels.iter().copied().fold(f64::NEG_INFINITY, f64::max));

    let subset = engine
        .extract(array, names::HEIGHT, &|h| lower <= h && h <= upper)?
        .ok_or(StrataError::NoLevelsInRange { lower, upper })?;

    let mut max_array = if subset.coord(names::HEIGHT)?.len() > 1 {
        engine.collapse(&subset, &[names::HEIGHT], Aggregator::Max)?
    } else {
        subset
    };
    if let Some(name) = new_name {
        max_array.rename(name);
    }
    Ok(max_array)
}

/// Height at which each cell of `array` reaches the value in `max_array`
///
/// Levels are scanned upwards, or downwards when `find_lowest` is false, and
/// every level whose value equals the maximum overwrites the output. The
/// last matching level in the scan therefore wins. Cells that match no level
/// keep the value of `max_array`. The result takes the units of the height
/// coordinate.
pub fn height_of_maximum(
    array: &LabelledArray,
    max_array: &LabelledArray,
    find_lowest: bool,
    new_name: Option<&str>,
) -> StrataResult<LabelledArray> {
    let height = array.coord(names::HEIGHT)?;
    if height.len() <= 1 {
        return Err(StrataError::InvalidInput(
            "More than 1 vertical level is required.".to_string(),
        ));
    }
    let axis = array.dim_of(names::HEIGHT).ok_or_else(|| {
        StrataError::Coordinate(format!("{} is not a dimension coordinate", names::HEIGHT))
    })?;

    let mut levels: Vec<usize> = (0..height.len()).collect();
    if !find_lowest {
        levels.reverse();
    }

    let mut result = max_array.clone();
    let mut heights = max_array.data.clone();
    for level in levels {
        let slice = array.index_axis(axis, level)?;
        if slice.shape() != max_array.shape() {
            return Err(StrataError::Shape {
                expected: max_array.shape().to_vec(),
                actual: slice.shape().to_vec(),
            });
        }
        let point = height.points[level];
        Zip::from(&mut heights)
            .and(&slice.data)
            .and(&max_array.data)
            .for_each(|out, &value, &max| {
                if value == max {
                    *out = point;
                }
            });
    }
    result.set_data(heights)?;
    if let Some(name) = new_name {
        result.rename(name);
    }
    result.metadata.units = height.units.clone();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use strata_core::{Coordinate, NdArrayEngine};

    fn column() -> LabelledArray {
        // height x site
        let data = ArrayD::from_shape_vec(
            IxDyn(&[3, 3]),
            vec![
                1.0, 5.0, 2.0, //
                4.0, 5.0, 2.0, //
                3.0, 1.0, 2.0,
            ],
        )
        .unwrap();
        LabelledArray::new(
            data,
            vec![
                Coordinate::new("height", vec![100.0, 200.0, 300.0]).with_units("m"),
                Coordinate::new("site", vec![0.0, 1.0, 2.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_maximum_in_range() {
        let engine = NdArrayEngine::new();
        let max = maximum_in_range(&engine, &column(), Some(150.0), Some(300.0), Some("max_wind"))
            .unwrap();
        assert_eq!(max.shape(), &[3]);
        assert_eq!(max.data.as_slice().unwrap(), &[4.0, 5.0, 2.0]);
        let height = max.coord("height").unwrap();
        assert_eq!(height.bounds, Some(vec![[200.0, 300.0]]));
        assert_eq!(max.name(), "max_wind");
    }

    #[test]
    fn test_maximum_in_range_defaults_and_single_level() {
        let engine = NdArrayEngine::new();
        let all = maximum_in_range(&engine, &column(), None, None, None).unwrap();
        assert_eq!(all.data.as_slice().unwrap(), &[4.0, 5.0, 2.0]);

        let single = maximum_in_range(&engine, &column(), Some(250.0), None, None).unwrap();
        assert_eq!(single.data.as_slice().unwrap(), &[3.0, 1.0, 2.0]);
        assert!(single.cell_methods().is_empty());
    }

    #[test]
    fn test_maximum_in_range_no_levels() {
        let engine = NdArrayEngine::new();
        assert_eq!(
            maximum_in_range(&engine, &column(), Some(400.0), Some(500.0), None),
            Err(StrataError::NoLevelsInRange {
                lower: 400.0,
                upper: 500.0
            })
        );
    }

    #[test]
    fn test_height_of_maximum_last_match_wins() {
        let engine = NdArrayEngine::new();
        let array = column();
        let max = maximum_in_range(&engine, &array, None, None, None).unwrap();

        let upward = height_of_maximum(&array, &max, true, Some("height_of_max")).unwrap();
        assert_eq!(upward.data.as_slice().unwrap(), &[200.0, 200.0, 300.0]);
        assert_eq!(upward.units(), "m");
        assert_eq!(upward.name(), "height_of_max");

        let downward = height_of_maximum(&array, &max, false, None).unwrap();
        assert_eq!(downward.data.as_slice().unwrap(), &[200.0, 100.0, 100.0]);
    }

    #[test]
    fn test_height_of_maximum_needs_levels() {
        let array = column().take(0, &[0]).unwrap();
        let max = array.index_axis(0, 0).unwrap();
        assert!(matches!(
            height_of_maximum(&array, &max, true, None),
            Err(StrataError::InvalidInput(_))
        ));
    }
}
