//! Axis insertion: broadcast an array over a new dimension

use strata_core::{ArrayMetadata, Coordinate, LabelledArray, StrataError, StrataResult};

/// Copy of `array` replicated along a new dimension described by `new_coord`
///
/// The new axis lands at `position`, which may be anything from `0` up to
/// the current number of dimensions. Existing auxiliary coordinates stay on
/// their axes. Without `copy_metadata` the result carries default metadata.
pub fn add_coordinate(
    array: &LabelledArray,
    new_coord: Coordinate,
    position: usize,
    copy_metadata: bool,
) -> StrataResult<LabelledArray> {
    let ndim = array.ndim();
    if position > ndim {
        return Err(StrataError::PositionOutOfRange { position, ndim });
    }
    if array.has_coord(&new_coord.name) {
        return Err(StrataError::Coordinate(format!(
            "{} is already present on the array",
            new_coord.name
        )));
    }
    // new axis is appended last, then moved into place
    let mut broadcast = array.clone();
    broadcast.append_dim(new_coord)?;

    if !copy_metadata {
        broadcast.metadata = ArrayMetadata::default();
    }

    let mut order: Vec<usize> = (0..ndim).collect();
    order.insert(position, ndim);
    if position != ndim {
        broadcast.transpose(&order)?;
    }
    Ok(broadcast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use strata_core::AttrValue;

    fn plane() -> LabelledArray {
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), (0..6).map(f64::from).collect()).unwrap();
        let mut metadata = ArrayMetadata::new("wind_speed", "m s-1");
        metadata
            .attributes
            .insert("source".to_string(), AttrValue::from("model"));
        LabelledArray::new(
            data,
            vec![
                Coordinate::new("latitude", vec![0.0, 1.0]),
                Coordinate::new("longitude", vec![0.0, 1.0, 2.0]),
            ],
        )
        .unwrap()
        .with_metadata(metadata)
        .with_aux_coord(Coordinate::new("lon_label", vec![7.0, 8.0, 9.0]), &[1])
        .unwrap()
    }

    #[test]
    fn test_add_coordinate_leading() {
        let heights = Coordinate::new("height", vec![1.5, 10.0]).with_units("m");
        let result = add_coordinate(&plane(), heights, 0, true).unwrap();
        assert_eq!(result.shape(), &[2, 2, 3]);
        assert_eq!(result.dim_coord_names(), vec!["height", "latitude", "longitude"]);
        assert_eq!(result.coord_dims("lon_label").unwrap(), vec![2]);
        assert_eq!(result.data[[0, 1, 2]], 5.0);
        assert_eq!(result.data[[1, 1, 2]], 5.0);
        assert_eq!(result.name(), "wind_speed");
        assert_eq!(result.attributes().len(), 1);
    }

    #[test]
    fn test_add_coordinate_middle_and_end() {
        let heights = Coordinate::new("height", vec![1.5, 10.0, 20.0]);
        let middle = add_coordinate(&plane(), heights.clone(), 1, true).unwrap();
        assert_eq!(middle.shape(), &[2, 3, 3]);
        assert_eq!(middle.dim_coord_names(), vec!["latitude", "height", "longitude"]);
        assert_eq!(middle.coord_dims("lon_label").unwrap(), vec![2]);

        let end = add_coordinate(&plane(), heights, 2, true).unwrap();
        assert_eq!(end.dim_coord_names(), vec!["latitude", "longitude", "height"]);
        assert_eq!(end.data[[1, 0, 2]], 3.0);
    }

    #[test]
    fn test_add_coordinate_without_metadata() {
        let result = add_coordinate(&plane(), Coordinate::new("height", vec![2.0]), 0, false).unwrap();
        assert_eq!(result.name(), "unknown");
        assert!(result.attributes().is_empty());
    }

    #[test]
    fn test_add_coordinate_position_out_of_range() {
        let result = add_coordinate(&plane(), Coordinate::new("height", vec![2.0]), 3, true);
        assert_eq!(
            result,
            Err(StrataError::PositionOutOfRange {
                position: 3,
                ndim: 2
            })
        );
    }
}
