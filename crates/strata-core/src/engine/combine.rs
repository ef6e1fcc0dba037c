//! Reference merge: combine compatible arrays into one
//!
//! Arrays combine in one of two ways:
//! - **concatenation** when exactly one dimension coordinate differs, extending
//!   that dimension;
//! - **new dimensions** when only scalar coordinates differ, each varying
//!   scalar either becoming a new leading dimension or an auxiliary coordinate
//!   on the new dimension that determines it.
//!
//! A coordinate that is scalar on some inputs and a dimension on others is
//! promoted to a length-one dimension first, so a merged result can be merged
//! again with further slices.

use std::collections::HashSet;

use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn};
use tracing::debug;

use crate::array::AuxCoord;
use crate::{merge_failure, Coordinate, LabelledArray, StrataResult};

pub(super) fn merge(mut arrays: Vec<LabelledArray>) -> StrataResult<LabelledArray> {
    match arrays.len() {
        0 => return Err(merge_failure("no arrays to merge")),
        1 => return Ok(arrays.remove(0)),
        _ => {}
    }

    promote_mixed_dimensions(&mut arrays)?;
    check_structure(&arrays)?;

    let first = &arrays[0];
    let differing_axes: Vec<usize> = (0..first.ndim())
        .filter(|&axis| {
            arrays[1..]
                .iter()
                .any(|a| a.dim_coords()[axis] != first.dim_coords()[axis])
        })
        .collect();
    let varying: Vec<String> = first
        .aux_coords()
        .iter()
        .filter(|aux| aux.is_scalar())
        .filter(|aux| {
            arrays[1..].iter().any(|a| {
                a.find_coord(&aux.coord.name)
                    .map_or(true, |c| *c != aux.coord)
            })
        })
        .map(|aux| aux.coord.name.clone())
        .collect();

    match (differing_axes.as_slice(), varying.is_empty()) {
        ([], true) => Err(merge_failure(
            "duplicate arrays: no coordinate differs between inputs",
        )),
        ([axis], true) => {
            debug!(
                axis = *axis,
                coord = %first.dim_coords()[*axis].name,
                count = arrays.len(),
                "concatenating arrays"
            );
            concatenate_along(arrays, *axis)
        }
        ([], false) => {
            debug!(?varying, count = arrays.len(), "merging arrays into new dimensions");
            merge_new_dimensions(arrays, &varying)
        }
        (axes, _) => Err(merge_failure(format!(
            "arrays differ along dimensions {:?} and scalar coordinates {:?}",
            axes.iter()
                .map(|&a| first.dim_coords()[a].name.as_str())
                .collect::<Vec<_>>(),
            varying
        ))),
    }
}

/// Promote scalar coordinates that label a dimension on another input
fn promote_mixed_dimensions(arrays: &mut [LabelledArray]) -> StrataResult<()> {
    // (coordinate, axis, auxiliaries on that axis, rank) from the first array using it as a dimension
    let mut promotions: Vec<(String, usize, Vec<String>, usize)> = Vec::new();
    for array in arrays.iter() {
        for (axis, coord) in array.dim_coords().iter().enumerate() {
            if promotions.iter().any(|p| p.0 == coord.name) {
                continue;
            }
            let dependents = array
                .aux_coords()
                .iter()
                .filter(|aux| aux.dims == [axis])
                .map(|aux| aux.coord.name.clone())
                .collect();
            promotions.push((coord.name.clone(), axis, dependents, array.ndim()));
        }
    }

    for (name, axis, dependents, rank) in &promotions {
        for array in arrays.iter_mut() {
            let is_scalar = array
                .aux_coords()
                .iter()
                .any(|aux| aux.coord.name == *name && aux.is_scalar());
            if !is_scalar || array.ndim() + 1 != *rank {
                continue;
            }
            array.promote_scalar(name, *axis)?;
            for dependent in dependents {
                let scalar = array
                    .aux_coords()
                    .iter()
                    .any(|aux| aux.coord.name == *dependent && aux.is_scalar());
                if scalar {
                    array.attach_scalar(dependent, *axis)?;
                }
            }
        }
    }
    Ok(())
}

/// Inputs must agree on metadata, precision and coordinate layout
fn check_structure(arrays: &[LabelledArray]) -> StrataResult<()> {
    let first = &arrays[0];
    let layout = |array: &LabelledArray| {
        let mut aux: Vec<(String, Vec<usize>)> = array
            .aux_coords()
            .iter()
            .map(|a| (a.coord.name.clone(), a.dims.clone()))
            .collect();
        aux.sort();
        aux
    };
    let first_layout = layout(first);

    for (i, array) in arrays.iter().enumerate().skip(1) {
        let meta = &array.metadata;
        let reference = &first.metadata;
        if meta.name() != reference.name() {
            return Err(merge_failure(format!(
                "array {} is named {:?}, expected {:?}",
                i,
                meta.name(),
                reference.name()
            )));
        }
        if meta.units != reference.units {
            return Err(merge_failure(format!(
                "array {} has units {:?}, expected {:?}",
                i, meta.units, reference.units
            )));
        }
        if meta.attributes != reference.attributes {
            return Err(merge_failure(format!("array {} has differing attributes", i)));
        }
        if meta.cell_methods != reference.cell_methods {
            return Err(merge_failure(format!("array {} has differing cell methods", i)));
        }
        if array.dtype != first.dtype {
            return Err(merge_failure(format!(
                "array {} has dtype {}, expected {}",
                i, array.dtype, first.dtype
            )));
        }
        if array.dim_coord_names() != first.dim_coord_names() {
            return Err(merge_failure(format!(
                "array {} has dimensions {:?}, expected {:?}",
                i,
                array.dim_coord_names(),
                first.dim_coord_names()
            )));
        }
        if layout(array) != first_layout {
            return Err(merge_failure(format!(
                "array {} has a different set of coordinates",
                i
            )));
        }
    }
    Ok(())
}

fn concatenate_along(mut arrays: Vec<LabelledArray>, axis: usize) -> StrataResult<LabelledArray> {
    let descending = arrays.iter().any(|a| {
        let points = &a.dim_coords()[axis].points;
        points.len() > 1 && points[0] > points[1]
    });
    arrays.sort_by(|a, b| {
        let ka = a.dim_coords()[axis].sort_key();
        let kb = b.dim_coords()[axis].sort_key();
        let ord = ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let first = &arrays[0];
    for array in &arrays[1..] {
        for (other, coord) in array.dim_coords().iter().enumerate() {
            if other != axis && *coord != first.dim_coords()[other] {
                return Err(merge_failure(format!(
                    "dimension {} differs as well as {}",
                    coord.name,
                    first.dim_coords()[axis].name
                )));
            }
        }
        for aux in array.aux_coords() {
            if aux.dims.contains(&axis) {
                if aux.dims.len() > 1 {
                    return Err(merge_failure(format!(
                        "cannot concatenate multi-dimensional coordinate {}",
                        aux.coord.name
                    )));
                }
            } else if first.find_coord(&aux.coord.name) != Some(&aux.coord) {
                return Err(merge_failure(format!(
                    "coordinate {} differs between inputs",
                    aux.coord.name
                )));
            }
        }
    }

    let dim_coord = join_coords(arrays.iter().map(|a| &a.dim_coords()[axis]))?;
    if !dim_coord.circular && !dim_coord.is_monotonic() {
        return Err(merge_failure(format!(
            "concatenation leaves {} non-monotonic: {:?}",
            dim_coord.name, dim_coord.points
        )));
    }

    let views: Vec<ArrayViewD<'_, f64>> = arrays.iter().map(|a| a.data.view()).collect();
    let data = concatenate(Axis(axis), &views).map_err(|e| merge_failure(e.to_string()))?;
    let mask = if arrays.iter().any(|a| a.mask.is_some()) {
        let masks: Vec<ArrayD<bool>> = arrays
            .iter()
            .map(|a| {
                a.mask
                    .clone()
                    .unwrap_or_else(|| ArrayD::from_elem(a.data.raw_dim(), false))
            })
            .collect();
        let mask_views: Vec<ArrayViewD<'_, bool>> = masks.iter().map(|m| m.view()).collect();
        Some(concatenate(Axis(axis), &mask_views).map_err(|e| merge_failure(e.to_string()))?)
    } else {
        None
    };

    let mut dim_coords = first.dim_coords().to_vec();
    dim_coords[axis] = dim_coord;
    let mut aux_coords = Vec::with_capacity(first.aux_coords().len());
    for aux in first.aux_coords() {
        let coord = if aux.dims == [axis] {
            let pieces: Vec<&Coordinate> = arrays
                .iter()
                .map(|a| a.coord(&aux.coord.name))
                .collect::<StrataResult<_>>()?;
            join_coords(pieces.into_iter())?
        } else {
            aux.coord.clone()
        };
        aux_coords.push(AuxCoord {
            coord,
            dims: aux.dims.clone(),
        });
    }

    LabelledArray::from_parts(
        data,
        first.dtype,
        mask,
        first.metadata.clone(),
        dim_coords,
        aux_coords,
    )
}

fn merge_new_dimensions(arrays: Vec<LabelledArray>, varying: &[String]) -> StrataResult<LabelledArray> {
    let first = &arrays[0];
    for array in &arrays[1..] {
        if array.shape() != first.shape() {
            return Err(merge_failure(format!(
                "shape {:?} differs from {:?}",
                array.shape(),
                first.shape()
            )));
        }
        for aux in array.aux_coords() {
            if varying.contains(&aux.coord.name) {
                continue;
            }
            if first.find_coord(&aux.coord.name) != Some(&aux.coord) {
                return Err(merge_failure(format!(
                    "coordinate {} differs between inputs",
                    aux.coord.name
                )));
            }
        }
    }

    // values[v][i]: scalar coordinate `varying[v]` on array `i`
    let values: Vec<Vec<Coordinate>> = varying
        .iter()
        .map(|name| {
            arrays
                .iter()
                .map(|a| a.coord(name).cloned())
                .collect::<StrataResult<Vec<_>>>()
        })
        .collect::<StrataResult<_>>()?;

    let determines = |d: usize, v: usize| {
        (0..arrays.len()).all(|i| {
            (0..arrays.len()).all(|j| values[d][i] != values[d][j] || values[v][i] == values[v][j])
        })
    };
    let mut new_dims: Vec<usize> = Vec::new();
    let mut dependents: Vec<(usize, usize)> = Vec::new();
    for v in 0..varying.len() {
        match new_dims.iter().position(|&d| determines(d, v)) {
            Some(slot) => dependents.push((v, slot)),
            None => new_dims.push(v),
        }
    }

    let distinct: Vec<Vec<Coordinate>> = new_dims
        .iter()
        .map(|&d| {
            let mut unique: Vec<Coordinate> = Vec::new();
            for coord in &values[d] {
                if !unique.contains(coord) {
                    unique.push(coord.clone());
                }
            }
            unique.sort_by(|a, b| {
                a.sort_key()
                    .partial_cmp(&b.sort_key())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            unique
        })
        .collect();

    let mut positions: Vec<Vec<usize>> = Vec::with_capacity(arrays.len());
    for i in 0..arrays.len() {
        let mut tuple = Vec::with_capacity(new_dims.len());
        for (slot, &d) in new_dims.iter().enumerate() {
            let idx = distinct[slot]
                .iter()
                .position(|c| *c == values[d][i])
                .ok_or_else(|| merge_failure("inconsistent coordinate values"))?;
            tuple.push(idx);
        }
        positions.push(tuple);
    }
    let cells: usize = distinct.iter().map(|d| d.len()).product();
    let unique: HashSet<&Vec<usize>> = positions.iter().collect();
    if cells != arrays.len() || unique.len() != arrays.len() {
        return Err(merge_failure(format!(
            "{} arrays do not fill the {} combinations of {:?}",
            arrays.len(),
            cells,
            new_dims.iter().map(|&d| varying[d].as_str()).collect::<Vec<_>>()
        )));
    }

    let mut new_coords = Vec::with_capacity(new_dims.len());
    for unique in &distinct {
        let coord = join_coords(unique.iter())?;
        if !coord.is_monotonic() {
            return Err(merge_failure(format!(
                "{} would be non-monotonic: {:?}",
                coord.name, coord.points
            )));
        }
        new_coords.push(coord);
    }
    let mut dependent_coords = Vec::with_capacity(dependents.len());
    for &(v, slot) in &dependents {
        let mut per_value: Vec<Option<&Coordinate>> = vec![None; distinct[slot].len()];
        for (i, tuple) in positions.iter().enumerate() {
            per_value[tuple[slot]] = Some(&values[v][i]);
        }
        let pieces: Vec<&Coordinate> = per_value.into_iter().flatten().collect();
        dependent_coords.push(AuxCoord {
            coord: join_coords(pieces.into_iter())?,
            dims: vec![slot],
        });
    }

    let lead: Vec<usize> = distinct.iter().map(|d| d.len()).collect();
    let mut shape = lead.clone();
    shape.extend_from_slice(first.shape());
    let any_mask = arrays.iter().any(|a| a.mask.is_some());
    let mut data = ArrayD::<f64>::zeros(IxDyn(&shape));
    let mut mask = any_mask.then(|| ArrayD::from_elem(IxDyn(&shape), false));
    for (array, tuple) in arrays.iter().zip(&positions) {
        let mut view = data.view_mut();
        for &idx in tuple {
            view = view.index_axis_move(Axis(0), idx);
        }
        view.assign(&array.data);
        if let (Some(mask), Some(source)) = (mask.as_mut(), array.mask.as_ref()) {
            let mut view = mask.view_mut();
            for &idx in tuple {
                view = view.index_axis_move(Axis(0), idx);
            }
            view.assign(source);
        }
    }

    let offset = new_dims.len();
    let template = arrays.into_iter().next().ok_or_else(|| merge_failure("no arrays"))?;
    let dtype = template.dtype;
    let metadata = template.metadata.clone();
    let (_, _, base_dims, base_aux) = template.into_parts();

    let mut dim_coords = new_coords;
    dim_coords.extend(base_dims);
    let mut aux_coords: Vec<AuxCoord> = dependent_coords;
    for mut aux in base_aux {
        if varying.contains(&aux.coord.name) {
            continue;
        }
        for d in aux.dims.iter_mut() {
            *d += offset;
        }
        aux_coords.push(aux);
    }

    LabelledArray::from_parts(data, dtype, mask, metadata, dim_coords, aux_coords)
}

/// Concatenate the points and bounds of several coordinates
fn join_coords<'a>(pieces: impl Iterator<Item = &'a Coordinate>) -> StrataResult<Coordinate> {
    let pieces: Vec<&Coordinate> = pieces.collect();
    let first = *pieces
        .first()
        .ok_or_else(|| merge_failure("no coordinates to join"))?;
    let bounded = pieces.iter().filter(|c| c.has_bounds()).count();
    if bounded != 0 && bounded != pieces.len() {
        return Err(merge_failure(format!(
            "{} is bounded on some inputs only",
            first.name
        )));
    }
    let points = pieces.iter().flat_map(|c| c.points.iter().copied()).collect();
    let bounds = (bounded != 0).then(|| {
        pieces
            .iter()
            .flat_map(|c| c.bounds.iter().flatten().copied())
            .collect()
    });
    Ok(Coordinate {
        points,
        bounds,
        ..first.clone()
    })
}
