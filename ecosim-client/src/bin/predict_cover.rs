use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{Context, Report, eyre};
use serde_json::json;
use tracing::info;

use ecosim_client::{
    ClientConfig, FileStorage, HttpPredictor, Predictor, Session, SimulatedPredictor,
};
use ecosim_core::schema::default_color;
use ecosim_core::{
    ClassCounts, Distribution, FeatureSchema, InputRecord, PredictionHistoryStore, RawValue,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short = 'c', long = "config", value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the prediction service
    #[arg(long = "api-url", value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Answer locally instead of calling the prediction service
    #[arg(long = "simulate", global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a record and print the predicted cover type
    Predict {
        /// Field value, repeatable
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, RawValue)>,

        /// Start from the example site instead of an empty record
        #[arg(long = "example")]
        example: bool,

        /// Seed for the simulated predictor
        #[arg(long = "seed")]
        seed: Option<u64>,

        /// Print the result as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Print how often each cover type has been predicted
    History,
    /// Forget all past predictions
    Clear,
    /// List the soil types offered on the input form
    Soils,
}

fn parse_field(arg: &str) -> std::result::Result<(String, RawValue), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {arg:?}"))?;
    let value = match value.trim().parse::<f64>() {
        Ok(number) => RawValue::Number(number),
        Err(_) => RawValue::Text(value.to_string()),
    };
    Ok((key.trim().to_string(), value))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    ecosim_client::logging::init()?;
    let args = Cli::parse();

    let mut config = ClientConfig::load(args.config.as_deref()).context("Could not load config.")?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    config.simulate |= args.simulate;

    match args.command {
        Command::Predict {
            fields,
            example,
            seed,
            json,
        } => predict(&config, fields, example, seed, json).await,
        Command::History => {
            let store = open_history(&config);
            print_counts(&store.counts());
            Ok(())
        }
        Command::Clear => {
            let mut store = open_history(&config);
            store.clear();
            if !store.is_persistent() {
                return Err(eyre!(
                    "Could not clear history in {}",
                    config.history_dir.display()
                ));
            }
            println!("History cleared.");
            Ok(())
        }
        Command::Soils => {
            let schema = FeatureSchema::forest_cover();
            let soils = schema
                .group("Soil_Type")
                .ok_or_else(|| eyre!("Schema has no soil group"))?;
            for (id, label) in soils.curated() {
                println!("{id:>3}  {label}");
            }
            Ok(())
        }
    }
}

async fn predict(
    config: &ClientConfig,
    fields: Vec<(String, RawValue)>,
    example: bool,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut record = if example {
        InputRecord::example()
    } else {
        InputRecord::new()
    };
    for (key, value) in fields {
        record.set(key, value);
    }

    let schema = FeatureSchema::forest_cover();
    let predictor: Box<dyn Predictor> = if config.simulate {
        info!("using simulated predictor");
        let seed = seed.unwrap_or_else(rand::random);
        Box::new(SimulatedPredictor::new(schema.classes().clone(), seed))
    } else {
        let http = HttpPredictor::from_config(config).context("Could not build HTTP client.")?;
        info!(url = http.url(), "using prediction service");
        Box::new(http)
    };

    let mut session = Session::new(schema, predictor, FileStorage::new(&config.history_dir))
        .with_timeout(config.request_timeout());
    if let Some(max_len) = config.history_max_len {
        session = session.with_history_max_len(max_len);
    }

    let outcome = match session.submit(&record).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let message = err.user_message();
            return Err(Report::new(err).wrap_err(message));
        }
    };

    if json {
        let probabilities: Vec<_> = outcome
            .distribution
            .iter()
            .flat_map(Distribution::ranked)
            .collect();
        let counts: serde_json::Map<_, _> = session
            .history_counts()
            .iter()
            .map(|(class, n)| (class.to_string(), json!(n)))
            .collect();
        let output = json!({
            "prediction": outcome.prediction,
            "probabilities": probabilities,
            "history": counts,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Predicted cover type: {}", outcome.prediction);
    if let Some(distribution) = &outcome.distribution {
        println!("\nConfidence:");
        for entry in distribution.ranked() {
            println!("  {:<18} {:>6.2}%", entry.class, entry.probability * 100.0);
        }
    }
    println!();
    print_counts(&session.history_counts());

    Ok(())
}

fn open_history(config: &ClientConfig) -> PredictionHistoryStore<FileStorage> {
    let schema = FeatureSchema::forest_cover();
    let store = PredictionHistoryStore::open(
        FileStorage::new(&config.history_dir),
        schema.classes().clone(),
    );
    match config.history_max_len {
        Some(max_len) => store.with_max_len(max_len),
        None => store,
    }
}

fn print_counts(counts: &ClassCounts) {
    println!("Prediction history ({} total):", counts.total());
    for (class, percent) in counts.bar_percentages() {
        let n = counts.get(class).unwrap_or(0);
        let bar = "#".repeat((percent / 5.0).round() as usize);
        let color = default_color(class).unwrap_or("-");
        println!("  {class:<18} {color:<8} {n:>4}  {bar}");
    }
}
