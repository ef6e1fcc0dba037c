//! Labelled array container
//!
//! A [`LabelledArray`] is an N-rank payload with exactly one dimension
//! coordinate per axis, any number of auxiliary coordinates, and array-level
//! metadata. Every mutating operation preserves the container invariants:
//! coordinate point counts match the extents of the axes they label, and
//! dimension coordinates stay strictly monotonic unless circular.

use std::collections::HashSet;

use ndarray::{ArrayD, Axis, IxDyn};

use crate::{
    names, not_found, ArrayMetadata, Attributes, CellMethod, Coordinate, DType, StrataError,
    StrataResult,
};

/// Auxiliary coordinate attached to zero or more axes
///
/// Points are stored flattened in row-major order over `dims`, in the order
/// the axes are listed. An empty `dims` makes the coordinate scalar.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxCoord {
    pub coord: Coordinate,
    pub dims: Vec<usize>,
}

impl AuxCoord {
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

/// N-dimensional payload with named coordinates and metadata
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledArray {
    pub data: ArrayD<f64>,
    pub dtype: DType,
    /// `true` marks a missing cell
    pub mask: Option<ArrayD<bool>>,
    pub metadata: ArrayMetadata,
    dim_coords: Vec<Coordinate>,
    aux_coords: Vec<AuxCoord>,
}

impl LabelledArray {
    /// Create an array of declared precision [`DType::F32`]
    pub fn new(data: ArrayD<f64>, dim_coords: Vec<Coordinate>) -> StrataResult<Self> {
        let array = LabelledArray {
            data: data.mapv(|v| DType::F32.cast(v)),
            dtype: DType::F32,
            mask: None,
            metadata: ArrayMetadata::default(),
            dim_coords,
            aux_coords: Vec::new(),
        };
        array.validate()?;
        Ok(array)
    }

    pub fn with_metadata(mut self, metadata: ArrayMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.cast_data(dtype);
        self
    }

    pub fn with_aux_coord(mut self, coord: Coordinate, dims: &[usize]) -> StrataResult<Self> {
        self.add_aux_coord(coord, dims)?;
        Ok(self)
    }

    pub fn with_mask(mut self, mask: ArrayD<bool>) -> StrataResult<Self> {
        if mask.shape() != self.data.shape() {
            return Err(StrataError::Shape {
                expected: self.shape().to_vec(),
                actual: mask.shape().to_vec(),
            });
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Check every container invariant
    pub fn validate(&self) -> StrataResult<()> {
        let shape = self.data.shape();
        if self.dim_coords.len() != shape.len() {
            return Err(StrataError::InvalidInput(format!(
                "{} dimension coordinates for an array of rank {}",
                self.dim_coords.len(),
                shape.len()
            )));
        }
        for (coord, &extent) in self.dim_coords.iter().zip(shape) {
            coord.check_extent(extent)?;
            if !coord.circular && !coord.is_monotonic() {
                return Err(StrataError::Coordinate(format!(
                    "dimension coordinate {} is not monotonic",
                    coord.name
                )));
            }
        }
        for aux in &self.aux_coords {
            self.check_aux(&aux.coord, &aux.dims)?;
        }
        let mut seen = HashSet::new();
        for coord in self.coords() {
            if !seen.insert(coord.name.as_str()) {
                return Err(StrataError::Coordinate(format!(
                    "duplicate coordinate {}",
                    coord.name
                )));
            }
        }
        if let Some(mask) = &self.mask {
            if mask.shape() != shape {
                return Err(StrataError::Shape {
                    expected: shape.to_vec(),
                    actual: mask.shape().to_vec(),
                });
            }
        }
        Ok(())
    }

    fn check_aux(&self, coord: &Coordinate, dims: &[usize]) -> StrataResult<()> {
        let mut extents = Vec::with_capacity(dims.len());
        for &d in dims {
            let extent = self.data.shape().get(d).copied().ok_or_else(|| {
                StrataError::InvalidInput(format!(
                    "{} attached to axis {} of an array of rank {}",
                    coord.name,
                    d,
                    self.ndim()
                ))
            })?;
            extents.push(extent);
        }
        if dims.iter().collect::<HashSet<_>>().len() != dims.len() {
            return Err(StrataError::InvalidInput(format!(
                "{} attached to a repeated axis",
                coord.name
            )));
        }
        let expected: usize = extents.iter().product();
        if coord.len() != expected {
            return Err(StrataError::Shape {
                expected: extents,
                actual: vec![coord.len()],
            });
        }
        coord.check_extent(expected)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn units(&self) -> &str {
        &self.metadata.units
    }

    pub fn attributes(&self) -> &Attributes {
        &self.metadata.attributes
    }

    pub fn cell_methods(&self) -> &[CellMethod] {
        &self.metadata.cell_methods
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.metadata.name = Some(name.into());
        self.metadata.var_name = None;
    }

    pub fn dim_coords(&self) -> &[Coordinate] {
        &self.dim_coords
    }

    pub fn aux_coords(&self) -> &[AuxCoord] {
        &self.aux_coords
    }

    /// Every coordinate: dimension coordinates first, then auxiliaries
    pub fn coords(&self) -> impl Iterator<Item = &Coordinate> {
        self.dim_coords
            .iter()
            .chain(self.aux_coords.iter().map(|a| &a.coord))
    }

    pub(crate) fn coords_mut(&mut self) -> impl Iterator<Item = &mut Coordinate> {
        self.dim_coords
            .iter_mut()
            .chain(self.aux_coords.iter_mut().map(|a| &mut a.coord))
    }

    pub fn find_coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords().find(|c| c.name == name)
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.find_coord(name).is_some()
    }

    pub fn coord(&self, name: &str) -> StrataResult<&Coordinate> {
        self.find_coord(name)
            .ok_or_else(|| not_found(name))
    }

    /// Mutable access to a coordinate
    ///
    /// Callers must keep the point count unchanged; [`LabelledArray::validate`]
    /// re-checks the invariants.
    pub fn coord_mut(&mut self, name: &str) -> StrataResult<&mut Coordinate> {
        self.coords_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| not_found(name))
    }

    /// Axes the named coordinate is attached to
    pub fn coord_dims(&self, name: &str) -> StrataResult<Vec<usize>> {
        if let Some(axis) = self.dim_of(name) {
            return Ok(vec![axis]);
        }
        self.aux_coords
            .iter()
            .find(|a| a.coord.name == name)
            .map(|a| a.dims.clone())
            .ok_or_else(|| not_found(name))
    }

    /// Axis described by the named dimension coordinate
    pub fn dim_of(&self, name: &str) -> Option<usize> {
        self.dim_coords.iter().position(|c| c.name == name)
    }

    pub fn is_dim_coord(&self, name: &str) -> bool {
        self.dim_of(name).is_some()
    }

    pub fn dim_coord_names(&self) -> Vec<&str> {
        self.dim_coords.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn coord_names(&self) -> Vec<&str> {
        self.coords().map(|c| c.name.as_str()).collect()
    }

    // ------------------------------------------------------------------
    // Coordinate management
    // ------------------------------------------------------------------

    pub fn add_aux_coord(&mut self, coord: Coordinate, dims: &[usize]) -> StrataResult<()> {
        if self.has_coord(&coord.name) {
            return Err(StrataError::Coordinate(format!(
                "coordinate {} already present",
                coord.name
            )));
        }
        self.check_aux(&coord, dims)?;
        self.aux_coords.push(AuxCoord {
            coord,
            dims: dims.to_vec(),
        });
        Ok(())
    }

    /// Remove an auxiliary coordinate
    ///
    /// Dimension coordinates cannot be removed: every axis must stay named.
    pub fn remove_coord(&mut self, name: &str) -> StrataResult<Coordinate> {
        if self.is_dim_coord(name) {
            return Err(StrataError::Coordinate(format!(
                "cannot remove dimension coordinate {}",
                name
            )));
        }
        let position = self
            .aux_coords
            .iter()
            .position(|a| a.coord.name == name)
            .ok_or_else(|| not_found(name))?;
        Ok(self.aux_coords.remove(position).coord)
    }

    /// Replace the payload, keeping the declared precision
    pub fn set_data(&mut self, data: ArrayD<f64>) -> StrataResult<()> {
        if data.shape() != self.data.shape() {
            return Err(StrataError::Shape {
                expected: self.shape().to_vec(),
                actual: data.shape().to_vec(),
            });
        }
        let dtype = self.dtype;
        self.data = data.mapv(|v| dtype.cast(v));
        Ok(())
    }

    /// Round the payload through `dtype` and declare it
    pub fn cast_data(&mut self, dtype: DType) {
        self.data.mapv_inplace(|v| dtype.cast(v));
        self.dtype = dtype;
    }

    pub fn is_masked(&self) -> bool {
        self.mask.as_ref().map_or(false, |m| m.iter().any(|&v| v))
    }

    pub fn fully_masked(&self) -> bool {
        self.mask
            .as_ref()
            .map_or(false, |m| !m.is_empty() && m.iter().all(|&v| v))
    }

    // ------------------------------------------------------------------
    // Axis operations
    // ------------------------------------------------------------------

    /// Reorder axes in place: axis `i` of the result is axis `order[i]` of the input
    pub fn transpose(&mut self, order: &[usize]) -> StrataResult<()> {
        let ndim = self.ndim();
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        if sorted != (0..ndim).collect::<Vec<_>>() {
            return Err(StrataError::InvalidInput(format!(
                "{:?} is not a permutation of {} axes",
                order, ndim
            )));
        }
        let mut inverse = vec![0; ndim];
        for (new, &old) in order.iter().enumerate() {
            inverse[old] = new;
        }

        let data = std::mem::take(&mut self.data);
        self.data = data
            .permuted_axes(IxDyn(order))
            .as_standard_layout()
            .into_owned();
        if let Some(mask) = self.mask.take() {
            self.mask = Some(mask.permuted_axes(IxDyn(order)).as_standard_layout().into_owned());
        }
        let mut old_coords: Vec<Option<Coordinate>> =
            self.dim_coords.drain(..).map(Some).collect();
        self.dim_coords = order
            .iter()
            .filter_map(|&old| old_coords[old].take())
            .collect();
        for aux in self.aux_coords.iter_mut() {
            for d in aux.dims.iter_mut() {
                *d = inverse[*d];
            }
        }
        Ok(())
    }

    /// Select `indices` along `axis`, keeping the axis
    pub fn take(&self, axis: usize, indices: &[usize]) -> StrataResult<LabelledArray> {
        self.check_axis(axis)?;
        let extent = self.shape()[axis];
        if let Some(&bad) = indices.iter().find(|&&i| i >= extent) {
            return Err(StrataError::InvalidInput(format!(
                "index {} out of range for axis {} of length {}",
                bad, axis, extent
            )));
        }
        let dim_coord = self.dim_coords[axis].take(indices)?;
        if !dim_coord.circular && !dim_coord.is_monotonic() {
            return Err(StrataError::Coordinate(format!(
                "selection leaves dimension coordinate {} non-monotonic",
                dim_coord.name
            )));
        }

        let mut result = self.clone();
        result.data = self.data.select(Axis(axis), indices);
        result.mask = self.mask.as_ref().map(|m| m.select(Axis(axis), indices));
        result.dim_coords[axis] = dim_coord;
        for aux in result.aux_coords.iter_mut() {
            if let Some(p) = aux.dims.iter().position(|&d| d == axis) {
                let grid = self.aux_index_grid(aux)?.select(Axis(p), indices);
                let order: Vec<usize> = grid.iter().copied().collect();
                aux.coord = aux.coord.take(&order)?;
            }
        }
        Ok(result)
    }

    /// Squeeze `axis` at `index`; its coordinates become scalar coordinates
    pub fn index_axis(&self, axis: usize, index: usize) -> StrataResult<LabelledArray> {
        self.check_axis(axis)?;
        if index >= self.shape()[axis] {
            return Err(StrataError::InvalidInput(format!(
                "index {} out of range for axis {} of length {}",
                index,
                axis,
                self.shape()[axis]
            )));
        }
        let mut aux_coords = Vec::with_capacity(self.aux_coords.len() + 1);
        for aux in &self.aux_coords {
            let mut aux = aux.clone();
            if let Some(p) = aux.dims.iter().position(|&d| d == axis) {
                let grid = self.aux_index_grid(&aux)?.index_axis(Axis(p), index).to_owned();
                let order: Vec<usize> = grid.iter().copied().collect();
                aux.coord = aux.coord.take(&order)?;
                aux.dims.remove(p);
            }
            for d in aux.dims.iter_mut() {
                if *d > axis {
                    *d -= 1;
                }
            }
            aux_coords.push(aux);
        }
        aux_coords.push(AuxCoord {
            coord: self.dim_coords[axis].index(index)?,
            dims: Vec::new(),
        });
        let mut dim_coords = self.dim_coords.clone();
        dim_coords.remove(axis);

        Ok(LabelledArray {
            data: self.data.index_axis(Axis(axis), index).to_owned(),
            dtype: self.dtype,
            mask: self
                .mask
                .as_ref()
                .map(|m| m.index_axis(Axis(axis), index).to_owned()),
            metadata: self.metadata.clone(),
            dim_coords,
            aux_coords,
        })
    }

    /// Turn the scalar coordinate `name` into a length-one dimension at `axis`
    pub fn promote_scalar(&mut self, name: &str, axis: usize) -> StrataResult<()> {
        if axis > self.ndim() {
            return Err(StrataError::PositionOutOfRange {
                position: axis,
                ndim: self.ndim(),
            });
        }
        let position = self
            .aux_coords
            .iter()
            .position(|a| a.coord.name == name && a.is_scalar())
            .ok_or_else(|| {
                StrataError::Coordinate(format!("{} is not a scalar coordinate", name))
            })?;
        let coord = self.aux_coords.remove(position).coord;
        let data = std::mem::take(&mut self.data);
        self.data = data.insert_axis(Axis(axis));
        if let Some(mask) = self.mask.take() {
            self.mask = Some(mask.insert_axis(Axis(axis)));
        }
        for aux in self.aux_coords.iter_mut() {
            for d in aux.dims.iter_mut() {
                if *d >= axis {
                    *d += 1;
                }
            }
        }
        self.dim_coords.insert(axis, coord);
        Ok(())
    }

    /// Append a trailing axis labelled by `coord`, replicating the payload along it
    pub fn append_dim(&mut self, coord: Coordinate) -> StrataResult<()> {
        if self.has_coord(&coord.name) {
            return Err(StrataError::Coordinate(format!(
                "coordinate {} already present",
                coord.name
            )));
        }
        coord.check_extent(coord.len())?;
        if !coord.circular && !coord.is_monotonic() {
            return Err(StrataError::Coordinate(format!(
                "dimension coordinate {} is not monotonic",
                coord.name
            )));
        }
        let ndim = self.ndim();
        let mut shape = self.shape().to_vec();
        shape.push(coord.len());
        let broadcast_error = || StrataError::Shape {
            expected: shape.clone(),
            actual: self.shape().to_vec(),
        };
        let data = self
            .data
            .view()
            .insert_axis(Axis(ndim))
            .broadcast(shape.clone())
            .map(|view| view.to_owned())
            .ok_or_else(broadcast_error)?;
        let mask = match &self.mask {
            Some(mask) => Some(
                mask.view()
                    .insert_axis(Axis(ndim))
                    .broadcast(shape.clone())
                    .map(|view| view.to_owned())
                    .ok_or_else(broadcast_error)?,
            ),
            None => None,
        };
        self.data = data;
        self.mask = mask;
        self.dim_coords.push(coord);
        Ok(())
    }

    /// Attach a scalar auxiliary coordinate to a length-one axis
    pub fn attach_scalar(&mut self, name: &str, axis: usize) -> StrataResult<()> {
        self.check_axis(axis)?;
        let aux = self
            .aux_coords
            .iter_mut()
            .find(|a| a.coord.name == name && a.is_scalar())
            .ok_or_else(|| {
                StrataError::Coordinate(format!("{} is not a scalar coordinate", name))
            })?;
        if self.data.shape()[axis] != 1 {
            return Err(StrataError::Shape {
                expected: vec![1],
                actual: vec![self.data.shape()[axis]],
            });
        }
        aux.dims = vec![axis];
        Ok(())
    }

    fn check_axis(&self, axis: usize) -> StrataResult<()> {
        if axis >= self.ndim() {
            return Err(StrataError::InvalidInput(format!(
                "axis {} out of range for array of rank {}",
                axis,
                self.ndim()
            )));
        }
        Ok(())
    }

    /// Flattened point indices of an auxiliary coordinate laid out over its axes
    fn aux_index_grid(&self, aux: &AuxCoord) -> StrataResult<ArrayD<usize>> {
        let extents: Vec<usize> = aux.dims.iter().map(|&d| self.shape()[d]).collect();
        ArrayD::from_shape_vec(IxDyn(&extents), (0..aux.coord.len()).collect())
            .map_err(|e| StrataError::Coordinate(format!("{}: {}", aux.coord.name, e)))
    }

    // ------------------------------------------------------------------
    // Engine support
    // ------------------------------------------------------------------

    pub(crate) fn from_parts(
        data: ArrayD<f64>,
        dtype: DType,
        mask: Option<ArrayD<bool>>,
        metadata: ArrayMetadata,
        dim_coords: Vec<Coordinate>,
        aux_coords: Vec<AuxCoord>,
    ) -> StrataResult<Self> {
        let array = LabelledArray {
            data,
            dtype,
            mask,
            metadata,
            dim_coords,
            aux_coords,
        };
        array.validate()?;
        Ok(array)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        ArrayD<f64>,
        Option<ArrayD<bool>>,
        Vec<Coordinate>,
        Vec<AuxCoord>,
    ) {
        (self.data, self.mask, self.dim_coords, self.aux_coords)
    }
}

/// Coordinate marking probability thresholds
///
/// Found by its variable name `"threshold"`, falling back to a coordinate
/// named `"threshold"`.
pub fn find_threshold_coordinate(array: &LabelledArray) -> StrataResult<&Coordinate> {
    array
        .coords()
        .find(|c| c.var_name.as_deref() == Some(names::THRESHOLD))
        .or_else(|| array.find_coord(names::THRESHOLD))
        .ok_or_else(|| not_found(names::THRESHOLD))
}
