//! Score a predictions file against a SQuAD-format dev set.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use indexmap::IndexMap;
use kotae_core::scoring::{evaluate, Dataset};

#[derive(Parser, Debug)]
#[command(name = "evaluate", about = "SQuAD exact-match / F1 scoring")]
struct Args {
    /// SQuAD v1.1/v2.0 dev file.
    #[arg(long)]
    dev_file: PathBuf,

    /// Predictions file (question id -> answer text).
    #[arg(long)]
    predictions: PathBuf,

    /// Null-odds file from the decoder; enables the threshold search.
    #[arg(long)]
    null_odds: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let dataset = Dataset::from_file(&args.dev_file)?;
    let predictions: IndexMap<String, String> =
        serde_json::from_reader(BufReader::new(File::open(&args.predictions)?))?;
    let null_odds: Option<IndexMap<String, f32>> = match &args.null_odds {
        Some(path) => Some(serde_json::from_reader(BufReader::new(File::open(path)?))?),
        None => None,
    };

    let metrics = evaluate(&dataset, &predictions, null_odds.as_ref());
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
