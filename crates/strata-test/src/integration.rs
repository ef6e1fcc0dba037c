//! End-to-end scenarios over the merge engine
//!
//! Scenario builders shared by the tests below and the benches:
//! - Ensembles whose realizations interleave
//! - Accumulations with bounded time coordinates

use strata_core::{Coordinate, DType, LabelledArray, StrataResult};

use crate::{ArrayBuilder, EnsembleConfig, EnsembleGenerator};

/// Two ensembles valid at `time` whose realizations follow on from each other
///
/// The second ensemble is renumbered to start after the first one's last
/// member, so merging them needs slicing over membership when they arrive
/// out of order.
pub fn split_ensemble(
    config: EnsembleConfig,
    time: f64,
) -> StrataResult<(LabelledArray, LabelledArray)> {
    let mut generator = EnsembleGenerator::new(config);
    let first = generator.surface_at(time)?;
    let mut second = generator.surface_at(time)?;
    let offset = first.coord("realization")?.len() as f64;
    for point in second.coord_mut("realization")?.points.iter_mut() {
        *point += offset;
    }
    Ok((first, second))
}

/// Precipitation accumulated over `[end - period, end]`
pub fn accumulation(end: f64, period: f64) -> StrataResult<LabelledArray> {
    ArrayBuilder::new("precipitation_amount", "kg m-2")
        .grid(2, 2, 1000.0)
        .scalar(
            Coordinate::scalar("time", end)
                .with_bounds(vec![[end - period, end]])
                .with_dtype(DType::I64),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineCall, RecordingEngine};
    use strata_core::{Aggregator, AttrValue, CellMethod, NdArrayEngine, StrataError};
    use strata_merge::{
        clip_values, compare_attributes, filter_to_common_times, reduce_membership,
        resample_membership, MergeEngine, MergeOptions,
    };

    fn light_series() -> Vec<LabelledArray> {
        EnsembleGenerator::new(EnsembleConfig::light())
            .surface_series()
            .unwrap()
    }

    #[test]
    fn test_merge_time_series_adds_leading_time_dimension() {
        let merger = MergeEngine::new();
        let mut series = light_series();
        let merged = merger.merge(&mut series).unwrap();

        assert_eq!(
            merged.dim_coord_names(),
            vec![
                "time",
                "realization",
                "projection_y_coordinate",
                "projection_x_coordinate"
            ]
        );
        assert_eq!(merged.shape(), &[2, 2, 2, 2]);
        assert_eq!(merged.data[[1, 0, 1, 1]], series[1].data[[0, 1, 1]]);
    }

    #[test]
    fn test_merge_drops_unmatched_attributes() {
        let merger = MergeEngine::new();
        let mut series = light_series();
        series[0]
            .metadata
            .attributes
            .insert("history".to_string(), AttrValue::from("created"));
        series[1]
            .metadata
            .attributes
            .insert("source".to_string(), AttrValue::from("radar"));
        for array in series.iter_mut() {
            array
                .metadata
                .attributes
                .insert("institution".to_string(), AttrValue::from("met service"));
            array
                .metadata
                .attributes
                .insert("title".to_string(), AttrValue::from("UKV Model Forecast"));
        }

        let before = compare_attributes(&series, None);
        assert!(before[0].contains_key("history"));
        assert!(before[1].contains_key("source"));

        let merged = merger.merge(&mut series).unwrap();
        assert_eq!(merged.attributes().len(), 2);
        assert!(merged.attributes().contains_key("institution"));
        assert!(merged.attributes().contains_key("title"));
        // copies were reconciled, the inputs were not
        assert!(series[1].attributes().contains_key("source"));
    }

    #[test]
    fn test_merge_in_place_reconciles_inputs() {
        let merger = MergeEngine::with_config(MergeOptions::in_place());
        let mut series = light_series();
        series[0]
            .metadata
            .cell_methods
            .push(CellMethod::new("mean", &["time"]));
        merger.merge(&mut series).unwrap();
        assert!(series[0].cell_methods().is_empty());
    }

    #[test]
    fn test_membership_merge_interleaves_realizations() {
        let recorder = RecordingEngine::new(NdArrayEngine::new());
        let merger = MergeEngine::with_engine(&recorder, MergeOptions::membership());
        let (first, second) = split_ensemble(EnsembleConfig::light(), 0.0).unwrap();

        let mut inputs = vec![second.clone(), first.clone()];
        let merged = merger.merge(&mut inputs).unwrap();
        assert_eq!(
            merged.coord("realization").unwrap().points,
            vec![0.0, 1.0, 2.0, 3.0]
        );
        assert_eq!(merged.data[[3, 1, 0]], second.data[[1, 1, 0]]);
        assert_eq!(merged.data[[0, 0, 1]], first.data[[0, 0, 1]]);

        assert_eq!(
            recorder.count(|c| matches!(c, EngineCall::SlicesOver { count: 2, .. })),
            2
        );
        assert_eq!(
            recorder.calls().last(),
            Some(&EngineCall::Merge { inputs: 4 })
        );

        // without slicing the two inputs go to the engine whole
        recorder.clear();
        let mut inputs = vec![first, second];
        merger
            .merge_with(&mut inputs, &MergeOptions::default())
            .unwrap();
        assert_eq!(recorder.calls(), vec![EngineCall::Merge { inputs: 2 }]);
    }

    #[test]
    fn test_accumulation_merge_rejects_mixed_periods() {
        let merger = MergeEngine::with_config(MergeOptions::accumulation());

        let mut matching = vec![
            accumulation(3600.0, 3600.0).unwrap(),
            accumulation(7200.0, 3600.0).unwrap(),
        ];
        assert!(merger.merge(&mut matching).is_ok());

        let mut mixed = vec![
            accumulation(3600.0, 3600.0).unwrap(),
            accumulation(10800.0, 7200.0).unwrap(),
        ];
        assert_eq!(
            merger.merge(&mut mixed),
            Err(StrataError::MismatchedBounds("time".to_string()))
        );
    }

    #[test]
    fn test_filter_resample_reduce_clip() {
        let merger = MergeEngine::new();
        let mut generator = EnsembleGenerator::new(EnsembleConfig::default());
        let early = generator.surface_at(3600.0).unwrap();
        let late = generator
            .surface_at(7200.0)
            .unwrap()
            .take(0, &[0, 1])
            .unwrap();

        let common = filter_to_common_times(&merger, &[early, late]).unwrap();
        assert_eq!(common.coord("realization").unwrap().points, vec![0.0, 1.0]);
        assert_eq!(common.coord("time").unwrap().points, vec![3600.0, 7200.0]);

        let grown = resample_membership(&merger, &common, 5).unwrap();
        assert_eq!(grown.shape()[0], 5);
        assert_eq!(grown.data[[4, 1, 2, 3]], common.data[[0, 1, 2, 3]]);

        let mean = reduce_membership(merger.engine(), &grown, Aggregator::Mean).unwrap();
        assert!(!mean.has_coord("realization"));
        assert_eq!(mean.shape(), &[2, 4, 4]);

        let clipped = clip_values(merger.engine(), &mean, 278.0, 282.0).unwrap();
        assert!(clipped.data.iter().all(|&v| (278.0..=282.0).contains(&v)));
        assert_eq!(clipped.dim_coord_names(), mean.dim_coord_names());
    }
}
