//! Metadata reconciliation across a set of arrays
//!
//! Diffing of attributes and coordinates, copying of metadata from a
//! template, and the equalisation steps run before every merge.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::{
    find_threshold_coordinate, AttrValue, Attributes, CellMethod, Coordinate, LabelledArray,
    StrataError, StrataResult,
};
use tracing::{debug, warn};

/// Provenance-only attributes whose removal during equalisation is not logged
///
/// They are still kept when every array agrees on their value.
pub const SILENT_ATTRIBUTES: [&str; 3] = ["history", "title", "mosg__grid_version"];

/// Placement of a coordinate not shared by every array
#[derive(Clone, Debug, PartialEq)]
pub struct UnmatchedCoord {
    /// Axis described, for a dimension coordinate
    pub data_dims: Option<usize>,
    /// First axis spanned, for an auxiliary coordinate
    pub aux_dims: Option<usize>,
    pub coord: Coordinate,
}

/// Attributes of each array whose value is not shared by all of them
///
/// `filter` restricts the comparison to keys containing that substring.
/// A single array has nothing to compare with and yields one empty mapping.
pub fn compare_attributes(arrays: &[LabelledArray], filter: Option<&str>) -> Vec<Attributes> {
    if arrays.len() == 1 {
        warn!("Only a single array so no differences will be found");
        return vec![Attributes::new()];
    }
    let selected: Vec<Attributes> = arrays
        .iter()
        .map(|array| match filter {
            Some(filter) => get_filtered_attributes(array, filter),
            None => array.attributes().clone(),
        })
        .collect();

    let mut common = match selected.first() {
        Some(first) => first.clone(),
        None => return Vec::new(),
    };
    for attrs in &selected[1..] {
        common.retain(|key, value| attrs.get(key) == Some(value));
    }

    selected
        .into_iter()
        .map(|mut attrs| {
            attrs.retain(|key, _| !common.contains_key(key));
            attrs
        })
        .collect()
}

/// Coordinates of each array that are not shared, identically, by all of them
///
/// Names in `ignore` are left out of the comparison.
pub fn compare_coords(
    arrays: &[LabelledArray],
    ignore: &[&str],
) -> Vec<BTreeMap<String, UnmatchedCoord>> {
    if arrays.len() == 1 {
        warn!("Only a single array so no differences will be found");
        return vec![BTreeMap::new()];
    }
    let Some(first) = arrays.first() else {
        return Vec::new();
    };
    let mut common: Vec<&Coordinate> = first
        .coords()
        .filter(|c| !ignore.contains(&c.name.as_str()))
        .collect();
    for array in &arrays[1..] {
        common.retain(|coord| array.find_coord(&coord.name) == Some(*coord));
    }
    let common: BTreeSet<&str> = common.iter().map(|c| c.name.as_str()).collect();

    arrays
        .iter()
        .map(|array| {
            let mut unmatched = BTreeMap::new();
            for (axis, coord) in array.dim_coords().iter().enumerate() {
                if ignore.contains(&coord.name.as_str()) || common.contains(coord.name.as_str()) {
                    continue;
                }
                unmatched.insert(
                    coord.name.clone(),
                    UnmatchedCoord {
                        data_dims: Some(axis),
                        aux_dims: None,
                        coord: coord.clone(),
                    },
                );
            }
            for aux in array.aux_coords() {
                let name = aux.coord.name.as_str();
                if ignore.contains(&name) || common.contains(name) {
                    continue;
                }
                unmatched.insert(
                    aux.coord.name.clone(),
                    UnmatchedCoord {
                        data_dims: None,
                        aux_dims: aux.dims.first().copied(),
                        coord: aux.coord.clone(),
                    },
                );
            }
            unmatched
        })
        .collect()
}

/// Copy attributes and auxiliary coordinates from the last array onto the others
///
/// Every requested key is looked up on the template before any array is
/// modified, so a missing key leaves the inputs untouched.
pub fn copy_metadata<'a>(
    arrays: &'a mut [LabelledArray],
    attributes: &[&str],
    aux_coords: &[&str],
) -> StrataResult<&'a mut [LabelledArray]> {
    let Some((template, targets)) = arrays.split_last_mut() else {
        return Err(StrataError::InvalidInput(
            "copy_metadata needs a template and at least one target array".to_string(),
        ));
    };
    if targets.is_empty() {
        return Err(StrataError::InvalidInput(
            "copy_metadata needs a template and at least one target array".to_string(),
        ));
    }

    let mut copied_attrs = Vec::with_capacity(attributes.len());
    for &key in attributes {
        let value = required_attribute(template, key)?;
        copied_attrs.push((key.to_string(), value.clone()));
    }
    let mut copied_coords = Vec::with_capacity(aux_coords.len());
    for &name in aux_coords {
        let coord = template.coord(name)?.clone();
        let dims = template.coord_dims(name)?;
        copied_coords.push((coord, dims));
    }

    for target in targets.iter_mut() {
        for (key, value) in &copied_attrs {
            target.metadata.attributes.insert(key.clone(), value.clone());
        }
        for (coord, dims) in &copied_coords {
            if target.has_coord(&coord.name) {
                target.remove_coord(&coord.name)?;
            }
            target.add_aux_coord(coord.clone(), dims)?;
        }
    }
    Ok(arrays)
}

/// Attributes whose key contains `filter`
pub fn get_filtered_attributes(array: &LabelledArray, filter: &str) -> Attributes {
    array
        .attributes()
        .iter()
        .filter(|(key, _)| key.contains(filter))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Names of the dimension coordinates, in axis order
pub fn get_dim_coord_names(array: &LabelledArray) -> Vec<String> {
    array.dim_coord_names().into_iter().map(String::from).collect()
}

/// Names of every coordinate, dimension coordinates first
pub fn get_coord_names(array: &LabelledArray) -> Vec<String> {
    array.coord_names().into_iter().map(String::from).collect()
}

/// Keep only the attributes that agree on every array
///
/// Returns the keys removed from each array. Removing a silent attribute is
/// not logged.
pub fn equalise_attributes(arrays: &mut [LabelledArray]) -> Vec<Vec<String>> {
    let unmatched = if arrays.len() > 1 {
        compare_attributes(arrays, None)
    } else {
        vec![Attributes::new(); arrays.len()]
    };

    arrays
        .iter_mut()
        .zip(unmatched)
        .map(|(array, unmatched)| {
            let removed: Vec<String> = unmatched.into_keys().collect();
            for key in &removed {
                if !SILENT_ATTRIBUTES.contains(&key.as_str()) {
                    debug!(array = %array.name(), attribute = %key, "Deleting unmatched attribute");
                }
                array.metadata.attributes.remove(key);
            }
            removed
        })
        .collect()
}

/// Remove variable names from every array and coordinate
///
/// The threshold coordinate keeps its variable name since that is how it is
/// identified.
pub fn strip_var_names(arrays: &mut [LabelledArray]) {
    for array in arrays.iter_mut() {
        array.metadata.var_name = None;
        let threshold = find_threshold_coordinate(array)
            .ok()
            .map(|c| c.name.clone());
        for name in array
            .coord_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
        {
            if threshold.as_deref() == Some(name.as_str()) {
                continue;
            }
            if let Ok(coord) = array.coord_mut(&name) {
                coord.var_name = None;
            }
        }
    }
}

/// Reduce every array's cell methods to those shared by all arrays
///
/// The first array's ordering is kept.
pub fn equalise_cell_methods(arrays: &mut [LabelledArray]) {
    let Some(first) = arrays.first() else {
        return;
    };
    let common: Vec<CellMethod> = first
        .cell_methods()
        .iter()
        .filter(|method| arrays[1..].iter().all(|a| a.cell_methods().contains(method)))
        .cloned()
        .collect();
    for array in arrays.iter_mut() {
        array.metadata.cell_methods = common.clone();
    }
}

/// Value of an attribute or a lookup error naming it
pub fn required_attribute<'a>(array: &'a LabelledArray, key: &str) -> StrataResult<&'a AttrValue> {
    array
        .attributes()
        .get(key)
        .ok_or_else(|| StrataError::AttributeNotFound(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use strata_core::{ArrayMetadata, DType};
    use strata_test::capture_logs;

    fn field(source: &str, member: f64) -> LabelledArray {
        let mut metadata = ArrayMetadata::new("air_temperature", "K");
        metadata
            .attributes
            .insert("institution".to_string(), AttrValue::from("Met Office"));
        metadata
            .attributes
            .insert("source".to_string(), AttrValue::from(source));
        metadata
            .attributes
            .insert("history".to_string(), AttrValue::from(format!("run {}", member)));
        LabelledArray::new(
            ArrayD::zeros(IxDyn(&[2])),
            vec![Coordinate::new("latitude", vec![0.0, 1.0]).with_units("degrees")],
        )
        .unwrap()
        .with_metadata(metadata)
        .with_aux_coord(
            Coordinate::scalar("realization", member).with_dtype(DType::I32),
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_compare_attributes_identical() {
        let arrays = vec![field("model", 0.0), field("model", 0.0)];
        let result = compare_attributes(&arrays, None);
        assert_eq!(result, vec![Attributes::new(), Attributes::new()]);
    }

    #[test]
    fn test_compare_attributes_reports_differences() {
        let arrays = vec![field("ukv", 0.0), field("global", 1.0)];
        let result = compare_attributes(&arrays, None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get("source"), Some(&AttrValue::from("ukv")));
        assert_eq!(result[1].get("source"), Some(&AttrValue::from("global")));
        assert!(!result[0].contains_key("institution"));

        let filtered = compare_attributes(&arrays, Some("hist"));
        assert!(filtered[0].contains_key("history"));
        assert!(!filtered[0].contains_key("source"));
    }

    #[test]
    fn test_compare_attributes_key_missing_on_one() {
        let mut second = field("model", 0.0);
        second.metadata.attributes.remove("institution");
        let result = compare_attributes(&[field("model", 0.0), second], None);
        assert!(result[0].contains_key("institution"));
        assert!(result[1].is_empty());
    }

    #[test]
    fn test_compare_single_array() {
        let arrays = vec![field("model", 0.0)];
        let (attributes, logs) = capture_logs(|| compare_attributes(&arrays, None));
        assert_eq!(attributes, vec![Attributes::new()]);
        assert!(logs.contains("Only a single array so no differences will be found"));
        assert_eq!(compare_coords(&arrays, &[]), vec![BTreeMap::new()]);
    }

    #[test]
    fn test_compare_coords() {
        let arrays = vec![field("model", 0.0), field("model", 1.0)];
        let result = compare_coords(&arrays, &[]);
        assert_eq!(result[0].len(), 1);
        let unmatched = &result[1]["realization"];
        assert_eq!(unmatched.data_dims, None);
        assert_eq!(unmatched.aux_dims, None);
        assert_eq!(unmatched.coord.points, vec![1.0]);

        let ignored = compare_coords(&arrays, &["realization"]);
        assert!(ignored.iter().all(|m| m.is_empty()));
    }

    #[test]
    fn test_copy_metadata_from_template() {
        let mut template = field("global", 5.0);
        template
            .add_aux_coord(Coordinate::scalar("height", 1.5).with_units("m"), &[])
            .unwrap();
        let mut arrays = vec![field("ukv", 0.0), field("ukv", 1.0), template];
        copy_metadata(&mut arrays, &["source"], &["realization", "height"]).unwrap();
        for array in &arrays[..2] {
            assert_eq!(array.attributes()["source"], AttrValue::from("global"));
            assert_eq!(array.coord("realization").unwrap().points, vec![5.0]);
            assert_eq!(array.coord("height").unwrap().units, "m");
        }
    }

    #[test]
    fn test_copy_metadata_missing_key_leaves_inputs() {
        let mut arrays = vec![field("ukv", 0.0), field("global", 1.0)];
        let before = arrays.clone();
        assert!(matches!(
            copy_metadata(&mut arrays, &["source", "missing"], &[]),
            Err(StrataError::AttributeNotFound(key)) if key == "missing"
        ));
        assert!(matches!(
            copy_metadata(&mut arrays, &[], &["height"]),
            Err(StrataError::CoordinateNotFound(_))
        ));
        assert_eq!(arrays, before);

        let mut single = vec![field("ukv", 0.0)];
        assert!(copy_metadata(&mut single, &["source"], &[]).is_err());
    }

    #[test]
    fn test_equalise_attributes() {
        let mut arrays = vec![field("ukv", 0.0), field("global", 1.0)];
        let removed = equalise_attributes(&mut arrays);
        let expected = vec!["history".to_string(), "source".to_string()];
        assert_eq!(removed, vec![expected.clone(), expected]);
        for array in &arrays {
            assert_eq!(array.attributes().len(), 1);
            assert!(array.attributes().contains_key("institution"));
        }
    }

    #[test]
    fn test_equalise_attributes_keeps_matching_silent_attributes() {
        let mut arrays = vec![field("ukv", 0.0), field("ukv", 1.0)];
        for array in arrays.iter_mut() {
            array
                .metadata
                .attributes
                .insert("title".to_string(), AttrValue::from("UKV Model Forecast"));
        }
        let removed = equalise_attributes(&mut arrays);
        assert_eq!(removed[0], vec!["history".to_string()]);
        for array in &arrays {
            assert_eq!(
                array.attributes().get("title"),
                Some(&AttrValue::from("UKV Model Forecast"))
            );
            assert!(!array.attributes().contains_key("history"));
        }
    }

    #[test]
    fn test_strip_var_names_keeps_threshold() {
        let mut array = field("model", 0.0);
        array.metadata.var_name = Some("tas".to_string());
        array.coord_mut("latitude").unwrap().var_name = Some("lat".to_string());
        array
            .add_aux_coord(
                Coordinate::scalar("air_temperature", 273.0).with_var_name("threshold"),
                &[],
            )
            .unwrap();
        let mut arrays = vec![array];
        strip_var_names(&mut arrays);
        assert_eq!(arrays[0].metadata.var_name, None);
        assert_eq!(arrays[0].coord("latitude").unwrap().var_name, None);
        assert_eq!(
            arrays[0].coord("air_temperature").unwrap().var_name.as_deref(),
            Some("threshold")
        );
    }

    #[test]
    fn test_equalise_cell_methods() {
        let mean = CellMethod::new("mean", &["time"]);
        let max = CellMethod::new("maximum", &["height"]);
        let mut first = field("model", 0.0);
        first.metadata.cell_methods = vec![max.clone(), mean.clone()];
        let mut second = field("model", 1.0);
        second.metadata.cell_methods = vec![mean.clone()];
        let mut arrays = vec![first, second];
        equalise_cell_methods(&mut arrays);
        assert_eq!(arrays[0].cell_methods(), &[mean.clone()]);
        assert_eq!(arrays[1].cell_methods(), &[mean]);
    }

    #[test]
    fn test_name_helpers() {
        let array = field("model", 0.0);
        assert_eq!(get_dim_coord_names(&array), vec!["latitude"]);
        assert_eq!(get_coord_names(&array), vec!["latitude", "realization"]);
        assert_eq!(
            get_filtered_attributes(&array, "inst").keys().collect::<Vec<_>>(),
            vec!["institution"]
        );
        assert!(required_attribute(&array, "title").is_err());
    }
}
