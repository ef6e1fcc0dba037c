//! Ensemble Merge Example
//!
//! Merges a series of generated forecasts, keeps the realizations shared by
//! every validity time, then reduces them to a clipped ensemble mean and a
//! vertical maximum.

use strata_core::{Aggregator, ArrayEngine, LabelledArray, NdArrayEngine};
use strata_merge::{
    clip_values, compare_attributes, filter_to_common_times, height_of_maximum,
    maximum_in_range, reduce_membership, MergeEngine,
};
use strata_test::{EnsembleConfig, EnsembleGenerator};

fn main() {
    println!("=== Strata Ensemble Merge Example ===\n");

    // 1. Generate inputs
    println!("1. Generating forecasts...");
    let config = EnsembleConfig::default();
    let mut generator = EnsembleGenerator::new(config.clone());
    let first = generator.surface_at(3600.0).expect("generate");
    let second = generator
        .surface_at(7200.0)
        .expect("generate")
        .take(0, &[0, 1])
        .expect("drop a member");
    println!("   t+1h shape: {:?}", first.shape());
    println!("   t+2h shape: {:?}", second.shape());

    let differences = compare_attributes(&[first.clone(), second.clone()], None);
    println!("   Unmatched attributes: {:?}", differences);

    // 2. Merge, keeping realizations present at every time
    println!("\n2. Merging realizations common to all times");
    let merger = MergeEngine::new();
    let merged = filter_to_common_times(&merger, &[first, second]).expect("merge");
    println!("   Dimensions: {:?}", merged.dim_coord_names());
    println!("   Shape: {:?}", merged.shape());
    println!(
        "   Realizations: {:?}",
        merged.coord("realization").expect("realization").points
    );

    // 3. Reduce and clip
    println!("\n3. Ensemble mean clipped to [278, 282] K");
    let engine = NdArrayEngine::new();
    let mean = reduce_membership(&engine, &merged, Aggregator::Mean).expect("reduce");
    let clipped = clip_values(&engine, &mean, 278.0, 282.0).expect("clip");
    println!("   Cell methods: {:?}", clipped.cell_methods());
    println!(
        "   Range: {:.2} .. {:.2}",
        clipped.data.iter().copied().fold(f64::INFINITY, f64::min),
        clipped.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );

    // 4. Vertical maximum
    println!("\n4. Maximum between 10 m and 50 m");
    let column = generator.ensemble_at(3600.0).expect("generate");
    let max = maximum_in_range(&engine, &column, Some(10.0), Some(50.0), Some("max_temperature"))
        .expect("maximum");
    let within = levels_between(&engine, &column, 10.0, 50.0);
    let heights = height_of_maximum(&within, &max, true, Some("height_of_max_temperature"))
        .expect("height of maximum");
    println!("   {} shape: {:?}", max.name(), max.shape());
    println!(
        "   {} in {}: first cell {}",
        heights.name(),
        heights.units(),
        heights.data.iter().next().copied().unwrap_or(f64::NAN)
    );

    println!("\n=== Example Complete ===");
}

fn levels_between(
    engine: &NdArrayEngine,
    array: &LabelledArray,
    lower: f64,
    upper: f64,
) -> LabelledArray {
    engine
        .extract(array, "height", &|h| lower <= h && h <= upper)
        .expect("extract")
        .expect("levels in range")
}
