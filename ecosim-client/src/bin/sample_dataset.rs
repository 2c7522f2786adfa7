use std::fs;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context;
use serde::Serialize;

use ecosim_client::ClientConfig;
use ecosim_client::dataset::load_sample;
use ecosim_core::schema::default_color;
use ecosim_core::{ClassSet, MapPoint};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Reference dataset, defaults to the configured path
    #[arg(short = 'i', long = "input", value_name = "INPUT_FILE")]
    input: Option<PathBuf>,

    /// Maximum number of sampled points
    #[arg(short = 'n', long = "cap")]
    cap: Option<usize>,

    /// Write the sample as JSON to this file
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short = 'c', long = "config", value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

/// A sampled point with its position on the plot.
#[derive(Serialize)]
struct PlottedPoint<'a> {
    x: f64,
    y: f64,
    class: &'a str,
    #[serde(flatten)]
    point: &'a MapPoint,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    ecosim_client::logging::init()?;
    let args = Cli::parse();

    let mut config = ClientConfig::load(args.config.as_deref()).context("Could not load config.")?;
    if let Some(input) = args.input {
        config.dataset_path = input;
    }
    if let Some(cap) = args.cap {
        config.sample_cap = cap;
    }

    let classes = ClassSet::forest_cover();
    let (sample, load) = load_sample(&config.dataset_path, config.sample_cap, &classes)
        .with_context(|| format!("Could not sample {}", config.dataset_path.display()))?;

    println!(
        "Rows: {} | Skipped: {} | Valid: {} | Out of class range: {} | Sampled: {} (cap {})",
        load.rows,
        load.skipped,
        sample.valid_count(),
        sample.rejected_count(),
        sample.len(),
        config.sample_cap
    );

    let maxima = sample.maxima();
    println!(
        "Max roadway distance: {} | Max hydrology distance: {}",
        maxima.roadways, maxima.hydrology
    );
    if let Some(elevation) = maxima.elevation {
        println!("Max elevation: {elevation}");
    }

    println!("\nSampled points per cover type:");
    for (class, count) in sample.class_counts(&classes) {
        let color = default_color(class).unwrap_or("-");
        println!("  {class:<18} {color:<8} {count:>5}");
    }

    if let Some(output) = args.output {
        let scale = sample.scale();
        let plotted: Vec<PlottedPoint> = sample
            .points()
            .iter()
            .filter_map(|point| {
                Some(PlottedPoint {
                    x: scale.x_percent(point.roadways),
                    y: scale.y_percent(point.hydrology),
                    class: classes.label_for_id(point.cover_type)?,
                    point,
                })
            })
            .collect();

        let json = serde_json::json!({
            "maxima": maxima,
            "points": plotted,
        });
        fs::write(&output, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Could not write {}", output.display()))?;
        println!("\nWrote {} points to {}", plotted.len(), output.display());
    }

    Ok(())
}
