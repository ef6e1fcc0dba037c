//! ndarray-backed reference engine

use super::{aggregate, combine, Aggregator, ArrayEngine};
use crate::{invalid, LabelledArray, StrataError, StrataResult};

/// Reference [`ArrayEngine`] operating on in-memory ndarray payloads
#[derive(Clone, Copy, Debug, Default)]
pub struct NdArrayEngine;

impl NdArrayEngine {
    pub fn new() -> Self {
        NdArrayEngine
    }
}

impl ArrayEngine for NdArrayEngine {
    fn collapse(
        &self,
        array: &LabelledArray,
        coords: &[&str],
        aggregator: Aggregator,
    ) -> StrataResult<LabelledArray> {
        aggregate::collapse(array, coords, aggregator)
    }

    fn extract(
        &self,
        array: &LabelledArray,
        coord: &str,
        predicate: &dyn Fn(f64) -> bool,
    ) -> StrataResult<Option<LabelledArray>> {
        let dims = array.coord_dims(coord)?;
        let points = &array.coord(coord)?.points;
        let axis = match dims.as_slice() {
            [] => {
                let keep = points.iter().all(|&p| predicate(p));
                return Ok(keep.then(|| array.clone()));
            }
            [axis] => *axis,
            _ => {
                return Err(StrataError::Coordinate(format!(
                    "cannot constrain on multi-dimensional coordinate {}",
                    coord
                )))
            }
        };
        let matches: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| predicate(**p))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [index] => array.index_axis(axis, *index).map(Some),
            indices => array.take(axis, indices).map(Some),
        }
    }

    fn slices_over(&self, array: &LabelledArray, coord: &str) -> StrataResult<Vec<LabelledArray>> {
        let dims = array.coord_dims(coord)?;
        match dims.as_slice() {
            [] => Ok(vec![array.clone()]),
            [axis] => (0..array.shape()[*axis])
                .map(|i| array.index_axis(*axis, i))
                .collect(),
            _ => Err(StrataError::Coordinate(format!(
                "cannot slice over multi-dimensional coordinate {}",
                coord
            ))),
        }
    }

    fn slices(&self, array: &LabelledArray, keep: &[&str]) -> StrataResult<Vec<LabelledArray>> {
        let mut kept = Vec::with_capacity(keep.len());
        for name in keep {
            kept.extend(array.coord_dims(name)?);
        }
        let others: Vec<usize> = (0..array.ndim()).filter(|a| !kept.contains(a)).collect();
        let extents: Vec<usize> = others.iter().map(|&a| array.shape()[a]).collect();
        let total: usize = extents.iter().product();

        let mut result = Vec::with_capacity(total);
        let mut index = vec![0usize; others.len()];
        for _ in 0..total {
            let mut slice = array.clone();
            // squeezing earlier axes shifts the later ones down
            for (j, (&axis, &i)) in others.iter().zip(&index).enumerate() {
                slice = slice.index_axis(axis - j, i)?;
            }
            result.push(slice);
            for pos in (0..index.len()).rev() {
                index[pos] += 1;
                if index[pos] < extents[pos] {
                    break;
                }
                index[pos] = 0;
            }
        }
        Ok(result)
    }

    fn merge(&self, arrays: Vec<LabelledArray>) -> StrataResult<LabelledArray> {
        combine::merge(arrays)
    }

    fn check_coordinates(
        &self,
        original: &LabelledArray,
        mut result: LabelledArray,
    ) -> StrataResult<LabelledArray> {
        let wanted = original.dim_coord_names();
        // length-one dimensions come back from merging as scalars
        for name in &wanted {
            let scalar = result
                .aux_coords()
                .iter()
                .any(|aux| aux.coord.name == *name && aux.is_scalar());
            if scalar {
                result.promote_scalar(name, 0)?;
            }
        }
        let mut order = Vec::with_capacity(wanted.len());
        for name in &wanted {
            let axis = result.dim_of(name).ok_or_else(|| {
                invalid(format!(
                    "result dimensions {:?} do not match {:?}",
                    result.dim_coord_names(),
                    wanted
                ))
            })?;
            order.push(axis);
        }
        if order.len() != result.ndim() {
            return Err(invalid(format!(
                "result has {} dimensions, expected {}",
                result.ndim(),
                order.len()
            )));
        }
        if order.iter().enumerate().any(|(i, &a)| i != a) {
            result.transpose(&order)?;
        }
        if result.shape() != original.shape() {
            return Err(StrataError::Shape {
                expected: original.shape().to_vec(),
                actual: result.shape().to_vec(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttrValue, Coordinate, DType};
    use ndarray::{ArrayD, IxDyn};

    fn grid() -> LabelledArray {
        let data = ArrayD::from_shape_vec(
            IxDyn(&[2, 3, 2]),
            (0..12).map(|v| v as f64).collect(),
        )
        .unwrap();
        LabelledArray::new(
            data,
            vec![
                Coordinate::new("realization", vec![0.0, 1.0]).with_dtype(DType::I32),
                Coordinate::new("height", vec![10.0, 50.0, 100.0]).with_units("m"),
                Coordinate::new("latitude", vec![-10.0, 10.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_extract_single_level_squeezes() {
        let engine = NdArrayEngine::new();
        let level = engine
            .extract(&grid(), "height", &|h| h == 50.0)
            .unwrap()
            .unwrap();
        assert_eq!(level.shape(), &[2, 2]);
        assert_eq!(level.coord("height").unwrap().points, vec![50.0]);
        assert_eq!(level.data[[1, 0]], 8.0);
    }

    #[test]
    fn test_extract_range_and_no_match() {
        let engine = NdArrayEngine::new();
        let range = engine
            .extract(&grid(), "height", &|h| h >= 10.0 && h <= 50.0)
            .unwrap()
            .unwrap();
        assert_eq!(range.shape(), &[2, 2, 2]);
        assert!(engine.extract(&grid(), "height", &|h| h > 500.0).unwrap().is_none());
    }

    #[test]
    fn test_slices_over_and_merge_restore() {
        let engine = NdArrayEngine::new();
        let original = grid();
        let slices = engine.slices_over(&original, "realization").unwrap();
        assert_eq!(slices.len(), 2);
        let merged = engine.merge(slices).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_slices_keep_horizontal() {
        let engine = NdArrayEngine::new();
        let slices = engine.slices(&grid(), &["latitude"]).unwrap();
        assert_eq!(slices.len(), 6);
        assert!(slices.iter().all(|s| s.shape() == [2]));
        assert_eq!(slices[1].coord("height").unwrap().points, vec![50.0]);
        assert_eq!(slices[3].data[[1]], 7.0);
    }

    #[test]
    fn test_merge_concatenates_differing_dimension() {
        let engine = NdArrayEngine::new();
        let original = grid();
        let lower = original.take(1, &[0, 1]).unwrap();
        let upper = original.take(1, &[2]).unwrap();
        let merged = engine.merge(vec![upper, lower]).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_merge_rejects_duplicates_and_attribute_mismatch() {
        let engine = NdArrayEngine::new();
        assert!(matches!(
            engine.merge(vec![grid(), grid()]),
            Err(StrataError::Merge(_))
        ));

        let slices = engine.slices_over(&grid(), "realization").unwrap();
        let mut odd = slices[1].clone();
        odd.metadata
            .attributes
            .insert("source".to_string(), AttrValue::from("model"));
        assert!(engine.merge(vec![slices[0].clone(), odd]).is_err());
    }

    #[test]
    fn test_merge_promotes_scalar_against_dimension() {
        let engine = NdArrayEngine::new();
        let original = grid();
        let head = original.take(0, &[0]).unwrap();
        let tail = original.index_axis(0, 1).unwrap();
        let merged = engine.merge(vec![head, tail]).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_merge_scalar_dependent_becomes_aux() {
        let engine = NdArrayEngine::new();
        let slices: Vec<LabelledArray> = engine
            .slices_over(&grid(), "realization")
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.with_aux_coord(Coordinate::scalar("member_label", 100.0 + i as f64), &[])
                    .unwrap()
            })
            .collect();
        let merged = engine.merge(slices).unwrap();
        assert_eq!(merged.dim_coord_names(), vec!["realization", "height", "latitude"]);
        assert_eq!(merged.coord_dims("member_label").unwrap(), vec![0]);
        assert_eq!(merged.coord("member_label").unwrap().points, vec![100.0, 101.0]);
    }

    #[test]
    fn test_check_coordinates_restores_order() {
        let engine = NdArrayEngine::new();
        let original = grid();
        let mut shuffled = original.clone();
        shuffled.transpose(&[2, 0, 1]).unwrap();
        let restored = engine.check_coordinates(&original, shuffled).unwrap();
        assert_eq!(restored, original);

        let smaller = original.take(1, &[0]).unwrap();
        assert!(engine.check_coordinates(&original, smaller).is_err());
    }

    #[test]
    fn test_check_coordinates_promotes_length_one_dimension() {
        let engine = NdArrayEngine::new();
        let single = grid().take(0, &[1]).unwrap();
        let squeezed = single.index_axis(0, 0).unwrap();
        assert!(squeezed.coord_dims("realization").unwrap().is_empty());
        let restored = engine.check_coordinates(&single, squeezed).unwrap();
        assert_eq!(restored, single);
    }
}
