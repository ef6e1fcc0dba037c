//! Property tests for merge reconciliation and the bounds algebra

use proptest::prelude::*;
use strata_core::{ArrayEngine, Coordinate, DType, LabelledArray, NdArrayEngine};
use strata_merge::{clip_values, compare_attributes, compare_coords, expand_bounds, MergeEngine};

use crate::ArrayBuilder;

fn surface(members: usize, values: &[i32], time: f64) -> LabelledArray {
    let size = members * 4;
    let values = (0..size).map(|i| values[i % values.len()] as f64).collect();
    ArrayBuilder::air_temperature()
        .realizations(members)
        .grid(2, 2, 1000.0)
        .time(time)
        .attribute("source", "model")
        .values(values)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn identical_arrays_have_no_differences(
        members in 1usize..4,
        values in prop::collection::vec(-500i32..500, 1..16),
        copies in 2usize..5,
    ) {
        let array = surface(members, &values, 0.0);
        let arrays = vec![array; copies];
        prop_assert!(compare_attributes(&arrays, None).iter().all(|a| a.is_empty()));
        prop_assert!(compare_coords(&arrays, &[]).iter().all(|c| c.is_empty()));
    }

    #[test]
    fn clipping_is_bounded_and_idempotent(
        members in 1usize..4,
        values in prop::collection::vec(-500i32..500, 1..16),
        low in -300i32..0,
        width in 0i32..400,
    ) {
        let engine = NdArrayEngine::new();
        let array = surface(members, &values, 0.0);
        let (min, max) = (low as f64, (low + width) as f64);

        let once = clip_values(&engine, &array, min, max).unwrap();
        prop_assert!(once.data.iter().all(|&v| min <= v && v <= max));
        let twice = clip_values(&engine, &once, min, max).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn expanded_bounds_span_every_contributor(
        times in prop::collection::vec(0i64..100_000, 1..6),
    ) {
        let contributors: Vec<LabelledArray> = times
            .iter()
            .map(|&t| surface(1, &[280], t as f64))
            .collect();
        let mut target = contributors[0].clone();
        expand_bounds(&mut target, &contributors, &["time"]).unwrap();

        let lower = *times.iter().min().unwrap() as f64;
        let upper = *times.iter().max().unwrap() as f64;
        let time = target.coord("time").unwrap();
        prop_assert_eq!(time.bounds.clone(), Some(vec![[lower, upper]]));
        prop_assert_eq!(time.points.clone(), vec![upper]);
        prop_assert_eq!(time.dtype, DType::I64);
    }

    #[test]
    fn slicing_then_merging_restores_the_array(
        members in 2usize..5,
        values in prop::collection::vec(-500i32..500, 1..16),
    ) {
        let engine = NdArrayEngine::new();
        let array = surface(members, &values, 3600.0);
        let mut slices = engine.slices_over(&array, "realization").unwrap();
        slices.reverse();
        let merged = MergeEngine::new().merge(&mut slices).unwrap();
        prop_assert_eq!(merged, array);
    }

    #[test]
    fn merge_is_independent_of_grouping(
        values in prop::collection::vec(-500i32..500, 1..16),
        heights in prop::collection::btree_set(1i32..50, 3..6),
    ) {
        let merger = MergeEngine::new();
        let levels: Vec<LabelledArray> = heights
            .iter()
            .map(|&h| {
                let mut array = surface(2, &values, 0.0);
                array
                    .add_aux_coord(
                        Coordinate::scalar("height", h as f64 * 10.0).with_units("m"),
                        &[],
                    )
                    .unwrap();
                array
            })
            .collect();

        let mut all = levels.clone();
        let flat = merger.merge(&mut all).unwrap();

        let mut head = levels[..2].to_vec();
        let mut nested = vec![merger.merge(&mut head).unwrap()];
        nested.extend(levels[2..].iter().cloned());
        let grouped = merger.merge(&mut nested).unwrap();
        prop_assert_eq!(flat, grouped);
    }
}
