//! Reference collapse: statistical reduction along dimension coordinates

use ndarray::{ArrayD, Axis, IxDyn};

use super::Aggregator;
use crate::array::AuxCoord;
use crate::{
    invalid, not_found, CellMethod, Coordinate, DType, LabelledArray, StrataError, StrataResult,
};

/// Fill value written under masked cells
const MASKED_FILL: f64 = 0.0;

pub(super) fn collapse(
    array: &LabelledArray,
    coords: &[&str],
    aggregator: Aggregator,
) -> StrataResult<LabelledArray> {
    if coords.is_empty() {
        return Err(invalid("no coordinates to collapse"));
    }
    let mut axes = Vec::with_capacity(coords.len());
    for name in coords {
        let axis = array.dim_of(name).ok_or_else(|| {
            if array.has_coord(name) {
                StrataError::Coordinate(format!("{} is not a dimension coordinate", name))
            } else {
                not_found(*name)
            }
        })?;
        if !axes.contains(&axis) {
            axes.push(axis);
        }
    }
    axes.sort_unstable();
    let kept: Vec<usize> = (0..array.ndim()).filter(|a| !axes.contains(a)).collect();

    let (data, mask) = reduce_payload(array, &kept, &axes, aggregator)?;
    let dtype = if aggregator.escalates() {
        DType::F64
    } else {
        array.dtype
    };
    let data = data.mapv(|v| dtype.cast(v));

    let mut dim_coords = Vec::with_capacity(kept.len());
    for &axis in &kept {
        dim_coords.push(array.dim_coords()[axis].clone());
    }
    let new_axis = |old: usize| kept.iter().position(|&k| k == old);

    let mut aux_coords = Vec::with_capacity(array.aux_coords().len() + axes.len());
    for aux in array.aux_coords() {
        let spans_collapsed = aux.dims.iter().any(|d| axes.contains(d));
        if !spans_collapsed {
            aux_coords.push(AuxCoord {
                coord: aux.coord.clone(),
                dims: aux.dims.iter().filter_map(|&d| new_axis(d)).collect(),
            });
        } else if aux.dims.len() == 1 {
            aux_coords.push(AuxCoord {
                coord: collapse_coord(&aux.coord),
                dims: Vec::new(),
            });
        }
    }
    for &axis in &axes {
        aux_coords.push(AuxCoord {
            coord: collapse_coord(&array.dim_coords()[axis]),
            dims: Vec::new(),
        });
    }

    let mut metadata = array.metadata.clone();
    metadata
        .cell_methods
        .push(CellMethod::new(aggregator.cell_method(), coords));

    LabelledArray::from_parts(data, dtype, mask, metadata, dim_coords, aux_coords)
}

/// Reduce the payload over `axes`, returning data and an optional mask
fn reduce_payload(
    array: &LabelledArray,
    kept: &[usize],
    axes: &[usize],
    aggregator: Aggregator,
) -> StrataResult<(ArrayD<f64>, Option<ArrayD<bool>>)> {
    let shape = array.shape();
    let out_shape: Vec<usize> = kept.iter().map(|&a| shape[a]).collect();
    let rows: usize = out_shape.iter().product();
    let lane: usize = axes.iter().map(|&a| shape[a]).product();
    let order: Vec<usize> = kept.iter().chain(axes).copied().collect();

    let data = array
        .data
        .view()
        .permuted_axes(IxDyn(&order))
        .as_standard_layout()
        .into_owned()
        .into_shape(IxDyn(&[rows, lane]))
        .map_err(|e| invalid(format!("cannot reshape payload: {}", e)))?;
    let mask = match &array.mask {
        Some(mask) => Some(
            mask.view()
                .permuted_axes(IxDyn(&order))
                .as_standard_layout()
                .into_owned()
                .into_shape(IxDyn(&[rows, lane]))
                .map_err(|e| invalid(format!("cannot reshape mask: {}", e)))?,
        ),
        None => None,
    };

    let mut values = Vec::with_capacity(rows);
    let mut missing = Vec::with_capacity(rows);
    let mut buffer = Vec::with_capacity(lane);
    for (row, lane_values) in data.axis_iter(Axis(0)).enumerate() {
        buffer.clear();
        match &mask {
            Some(mask) => {
                let lane_mask = mask.index_axis(Axis(0), row);
                buffer.extend(
                    lane_values
                        .iter()
                        .zip(lane_mask.iter())
                        .filter(|pair| !*pair.1)
                        .map(|(&v, _)| v),
                );
            }
            None => buffer.extend(lane_values.iter().copied()),
        }
        match reduce_lane(&mut buffer, aggregator) {
            Some(v) => {
                values.push(v);
                missing.push(false);
            }
            None => {
                values.push(MASKED_FILL);
                missing.push(true);
            }
        }
    }

    let result = ArrayD::from_shape_vec(IxDyn(&out_shape), values)
        .map_err(|e| invalid(format!("cannot shape reduction: {}", e)))?;
    let result_mask = if missing.iter().any(|&m| m) {
        Some(
            ArrayD::from_shape_vec(IxDyn(&out_shape), missing)
                .map_err(|e| invalid(format!("cannot shape mask: {}", e)))?,
        )
    } else {
        None
    };
    Ok((result, result_mask))
}

/// Statistic of the unmasked values of one lane; `None` when undefined
fn reduce_lane(values: &mut [f64], aggregator: Aggregator) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    match aggregator {
        Aggregator::Sum => Some(values.iter().sum()),
        Aggregator::Mean => Some(values.iter().sum::<f64>() / n),
        Aggregator::Min => values.iter().copied().reduce(f64::min),
        Aggregator::Max => values.iter().copied().reduce(f64::max),
        Aggregator::Median => {
            values.sort_by(|a, b| a.total_cmp(b));
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                Some((values[mid - 1] + values[mid]) / 2.0)
            } else {
                Some(values[mid])
            }
        }
        Aggregator::StdDev => {
            // one delta degree of freedom
            if values.len() < 2 {
                return None;
            }
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(var.sqrt())
        }
    }
}

/// Scalar coordinate spanning every point of `coord`
fn collapse_coord(coord: &Coordinate) -> Coordinate {
    let [lower, upper] = coord.envelope().unwrap_or([f64::NAN, f64::NAN]);
    let dtype = coord.dtype.escalated();
    let point = dtype.cast((lower + upper) / 2.0);
    Coordinate {
        points: vec![point],
        bounds: Some(vec![[dtype.cast(lower), dtype.cast(upper)]]),
        dtype,
        ..coord.clone()
    }
}
