use color_eyre::Result;
use ecosim_client::DatasetError;
use ecosim_client::dataset::{load_sample, read_points};
use ecosim_core::{ClassSet, DatasetSampler};

use crate::helpers::{TRAIN_SAMPLE, assert_epsilon, test_data};

#[test]
fn reader_skips_incomplete_rows() -> Result<()> {
    let load = read_points(TRAIN_SAMPLE)?;
    assert_eq!(load.rows, 25);
    assert_eq!(load.skipped, 2);
    assert_eq!(load.points.len(), 23);
    Ok(())
}

#[test]
fn sample_is_strided_over_valid_rows() -> Result<()> {
    let classes = ClassSet::forest_cover();
    let (sample, _) = load_sample(TRAIN_SAMPLE, 10, &classes)?;

    assert_eq!(sample.valid_count(), 22);
    assert_eq!(sample.rejected_count(), 1);
    assert_eq!(sample.len(), 10);

    let elevations: Vec<f64> = sample.points().iter().filter_map(|p| p.elevation).collect();
    assert_eq!(
        elevations,
        vec![2501.0, 2503.0, 2505.0, 2508.0, 2510.0, 2512.0, 2515.0, 2517.0, 2519.0, 2522.0]
    );

    let counts = sample.class_counts(&classes);
    assert_eq!(counts[0], ("Spruce/Fir", 4));
    assert_eq!(counts[2], ("Ponderosa Pine", 3));
    assert_eq!(counts[4], ("Aspen", 3));
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 10);
    Ok(())
}

#[test]
fn sampling_twice_gives_the_same_points() -> Result<()> {
    let classes = ClassSet::forest_cover();
    let load = read_points(TRAIN_SAMPLE)?;
    let sampler = DatasetSampler::new(7, &classes);

    let first = sampler.sample(load.points.iter().cloned());
    let second = sampler.sample(load.points.iter().cloned());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn cap_above_source_size_keeps_everything_in_order() -> Result<()> {
    let classes = ClassSet::forest_cover();
    let (sample, load) = load_sample(TRAIN_SAMPLE, 2000, &classes)?;

    let expected: Vec<_> = load
        .points
        .into_iter()
        .filter(|p| p.is_valid(&classes))
        .collect();
    assert_eq!(sample.points(), expected.as_slice());
    Ok(())
}

#[test]
fn plot_positions_follow_sample_maxima() -> Result<()> {
    let classes = ClassSet::forest_cover();
    let (sample, _) = load_sample(TRAIN_SAMPLE, 10, &classes)?;

    let maxima = sample.maxima();
    assert_eq!(maxima.roadways, 2200.0);
    assert_eq!(maxima.hydrology, 220.0);

    let scale = sample.scale();
    let first = &sample.points()[0];
    assert_epsilon(scale.x_percent(first.roadways), 100.0 / 22.0, 1e-9);
    assert_epsilon(scale.y_percent(first.hydrology), 100.0 - 100.0 / 22.0, 1e-9);
    assert_epsilon(scale.x_percent(maxima.roadways), 100.0, 1e-9);
    assert_epsilon(scale.y_percent(maxima.hydrology), 0.0, 1e-9);
    Ok(())
}

#[test]
fn missing_dataset_is_an_error() {
    let classes = ClassSet::forest_cover();
    let result = load_sample(test_data("does_not_exist.csv"), 10, &classes);
    assert!(matches!(result, Err(DatasetError::Io { .. })));
}
