//! Coordinate definitions
//!
//! A coordinate labels one or more axes of a [`LabelledArray`](crate::LabelledArray)
//! with named, unit-bearing points and optional per-point bounds.

use std::fmt;

use crate::{DType, StrataError, StrataResult};

/// Well-known coordinate names
pub mod names {
    pub const REALIZATION: &str = "realization";
    pub const HEIGHT: &str = "height";
    pub const TIME: &str = "time";
    pub const FORECAST_PERIOD: &str = "forecast_period";
    pub const FORECAST_REFERENCE_TIME: &str = "forecast_reference_time";
    /// Alias resolved to the probability-threshold coordinate
    pub const THRESHOLD: &str = "threshold";
}

/// Spatial/temporal axis a coordinate describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordAxis {
    X,
    Y,
    Z,
    T,
}

impl CoordAxis {
    /// Guess the axis from a coordinate name
    pub fn guess(name: &str) -> Option<CoordAxis> {
        match name.to_ascii_lowercase().as_str() {
            "longitude" | "grid_longitude" | "projection_x_coordinate" | "x" => Some(CoordAxis::X),
            "latitude" | "grid_latitude" | "projection_y_coordinate" | "y" => Some(CoordAxis::Y),
            "height" | "altitude" | "depth" | "pressure" | "model_level_number" | "z" => {
                Some(CoordAxis::Z)
            }
            "time" | "forecast_reference_time" | "t" => Some(CoordAxis::T),
            _ => None,
        }
    }
}

/// A named, ordered set of points with optional bounds
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinate {
    pub name: String,
    /// Variable-level name, stripped before merging
    pub var_name: Option<String>,
    pub units: String,
    pub points: Vec<f64>,
    /// One `[lower, upper]` interval per point
    pub bounds: Option<Vec<[f64; 2]>>,
    /// Periodic domain (e.g. longitude)
    pub circular: bool,
    pub dtype: DType,
    pub(crate) axis: Option<CoordAxis>,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, points: Vec<f64>) -> Self {
        Coordinate {
            name: name.into(),
            var_name: None,
            units: "1".to_string(),
            points,
            bounds: None,
            circular: false,
            dtype: DType::F32,
            axis: None,
        }
    }

    /// Single-point coordinate
    pub fn scalar(name: impl Into<String>, point: f64) -> Self {
        Coordinate::new(name, vec![point])
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_var_name(mut self, var_name: impl Into<String>) -> Self {
        self.var_name = Some(var_name.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Vec<[f64; 2]>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self.points = self.points.iter().map(|&p| dtype.cast(p)).collect();
        if let Some(bounds) = self.bounds.as_mut() {
            for b in bounds.iter_mut() {
                *b = [dtype.cast(b[0]), dtype.cast(b[1])];
            }
        }
        self
    }

    pub fn with_axis(mut self, axis: CoordAxis) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn circular(mut self) -> Self {
        self.circular = true;
        self
    }

    /// Explicit axis, falling back to a guess from the name
    pub fn axis(&self) -> Option<CoordAxis> {
        self.axis.or_else(|| CoordAxis::guess(&self.name))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.points.len() == 1
    }

    #[inline]
    pub fn has_bounds(&self) -> bool {
        self.bounds.is_some()
    }

    /// Point at `index`
    pub fn point(&self, index: usize) -> StrataResult<f64> {
        self.points.get(index).copied().ok_or_else(|| {
            StrataError::Coordinate(format!(
                "index {} out of range for {} with {} points",
                index,
                self.name,
                self.len()
            ))
        })
    }

    /// Strictly increasing or strictly decreasing points
    pub fn is_monotonic(&self) -> bool {
        if self.points.len() < 2 {
            return true;
        }
        let increasing = self.points.windows(2).all(|w| w[0] < w[1]);
        let decreasing = self.points.windows(2).all(|w| w[0] > w[1]);
        increasing || decreasing
    }

    /// New coordinate holding the points (and bounds) at `indices`, in that order
    pub fn take(&self, indices: &[usize]) -> StrataResult<Coordinate> {
        let mut points = Vec::with_capacity(indices.len());
        for &i in indices {
            points.push(self.point(i)?);
        }
        let bounds = self
            .bounds
            .as_ref()
            .map(|b| indices.iter().map(|&i| b[i]).collect());
        Ok(Coordinate {
            points,
            bounds,
            ..self.clone()
        })
    }

    /// Single-point coordinate at `index`
    pub fn index(&self, index: usize) -> StrataResult<Coordinate> {
        self.take(&[index])
    }

    /// Round points and bounds through `dtype`
    pub fn cast(&mut self, dtype: DType) {
        let cast = self.clone().with_dtype(dtype);
        *self = cast;
    }

    /// Check the coordinate can label an axis of `extent` points
    pub fn check_extent(&self, extent: usize) -> StrataResult<()> {
        if self.len() != extent {
            return Err(StrataError::Shape {
                expected: vec![extent],
                actual: vec![self.len()],
            });
        }
        if let Some(bounds) = &self.bounds {
            if bounds.len() != self.len() {
                return Err(StrataError::Coordinate(format!(
                    "{} has {} points but {} bounds",
                    self.name,
                    self.len(),
                    bounds.len()
                )));
            }
        }
        Ok(())
    }

    /// Bounds envelope `[min lower, max upper]`, or the point range when unbounded
    pub fn envelope(&self) -> Option<[f64; 2]> {
        match &self.bounds {
            Some(bounds) if !bounds.is_empty() => {
                let lower = bounds.iter().flat_map(|b| b.iter()).copied().fold(f64::INFINITY, f64::min);
                let upper = bounds
                    .iter()
                    .flat_map(|b| b.iter())
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max);
                Some([lower, upper])
            }
            _ if !self.points.is_empty() => {
                let lower = self.points.iter().copied().fold(f64::INFINITY, f64::min);
                let upper = self.points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some([lower, upper])
            }
            _ => None,
        }
    }

    /// Sort key: first point, then lower bound
    pub(crate) fn sort_key(&self) -> (f64, f64) {
        let point = self.points.first().copied().unwrap_or(f64::NAN);
        let lower = self
            .bounds
            .as_ref()
            .and_then(|b| b.first())
            .map(|b| b[0])
            .unwrap_or(point);
        (point, lower)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {:?}", self.name, self.units, self.points)
    }
}
