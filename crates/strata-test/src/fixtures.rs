//! Labelled array fixtures

use ndarray::{ArrayD, IxDyn};
use strata_core::{
    names, ArrayMetadata, AttrValue, CellMethod, Coordinate, DType, LabelledArray, StrataError,
    StrataResult,
};

/// Builder for test arrays
///
/// Without explicit values the payload is a ramp `0, 1, 2, ...` in
/// row-major order, which makes every cell distinguishable.
#[derive(Clone, Debug)]
pub struct ArrayBuilder {
    metadata: ArrayMetadata,
    dims: Vec<Coordinate>,
    aux: Vec<(Coordinate, Vec<usize>)>,
    dtype: DType,
    values: Option<Vec<f64>>,
    mask: Option<Vec<bool>>,
}

impl ArrayBuilder {
    pub fn new(name: &str, units: &str) -> Self {
        ArrayBuilder {
            metadata: ArrayMetadata::new(name, units),
            dims: Vec::new(),
            aux: Vec::new(),
            dtype: DType::F32,
            values: None,
            mask: None,
        }
    }

    /// Air temperature in kelvin, the most common fixture
    pub fn air_temperature() -> Self {
        ArrayBuilder::new("air_temperature", "K")
    }

    pub fn dim(mut self, coord: Coordinate) -> Self {
        self.dims.push(coord);
        self
    }

    /// Realization dimension numbered from zero
    pub fn realizations(self, count: usize) -> Self {
        let ids = (0..count).map(|i| i as f64).collect();
        self.dim(Coordinate::new(names::REALIZATION, ids).with_dtype(DType::I32))
    }

    pub fn heights(self, levels: &[f64]) -> Self {
        self.dim(Coordinate::new(names::HEIGHT, levels.to_vec()).with_units("m"))
    }

    /// Projection y and x dimensions on a regular grid
    pub fn grid(self, rows: usize, cols: usize, spacing: f64) -> Self {
        let axis = |n: usize| (0..n).map(|i| i as f64 * spacing).collect();
        self.dim(Coordinate::new("projection_y_coordinate", axis(rows)).with_units("m"))
            .dim(Coordinate::new("projection_x_coordinate", axis(cols)).with_units("m"))
    }

    pub fn aux(mut self, coord: Coordinate, dims: &[usize]) -> Self {
        self.aux.push((coord, dims.to_vec()));
        self
    }

    pub fn scalar(self, coord: Coordinate) -> Self {
        self.aux(coord, &[])
    }

    /// Scalar time coordinate in seconds
    pub fn time(self, seconds: f64) -> Self {
        self.scalar(
            Coordinate::scalar(names::TIME, seconds)
                .with_units("seconds since 1970-01-01 00:00:00")
                .with_dtype(DType::I64),
        )
    }

    pub fn attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.metadata.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn cell_method(mut self, method: CellMethod) -> Self {
        self.metadata.cell_methods.push(method);
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn build(self) -> StrataResult<LabelledArray> {
        let shape: Vec<usize> = self.dims.iter().map(|c| c.len()).collect();
        let size: usize = shape.iter().product();
        let values = self
            .values
            .unwrap_or_else(|| (0..size).map(|i| i as f64).collect());
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| StrataError::Shape {
            expected: shape.clone(),
            actual: vec![size],
        })?;

        let mut array = LabelledArray::new(ArrayD::zeros(IxDyn(&shape)), self.dims)?
            .with_dtype(self.dtype)
            .with_metadata(self.metadata);
        array.set_data(data)?;
        for (coord, dims) in self.aux {
            array.add_aux_coord(coord, &dims)?;
        }
        if let Some(mask) = self.mask {
            let mask = ArrayD::from_shape_vec(IxDyn(&shape), mask).map_err(|_| {
                StrataError::Shape {
                    expected: shape.clone(),
                    actual: vec![size],
                }
            })?;
            array = array.with_mask(mask)?;
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_ramp() {
        let array = ArrayBuilder::air_temperature()
            .realizations(2)
            .grid(2, 3, 2000.0)
            .time(3600.0)
            .attribute("source", "model")
            .build()
            .unwrap();
        assert_eq!(array.shape(), &[2, 2, 3]);
        assert_eq!(array.data[[1, 1, 2]], 11.0);
        assert_eq!(array.coord("projection_x_coordinate").unwrap().points[2], 4000.0);
        assert!(array.coord_dims("time").unwrap().is_empty());
        assert_eq!(array.units(), "K");
    }

    #[test]
    fn test_builder_rejects_wrong_value_count() {
        let result = ArrayBuilder::air_temperature()
            .realizations(2)
            .values(vec![1.0])
            .build();
        assert!(matches!(result, Err(StrataError::Shape { .. })));
    }
}
