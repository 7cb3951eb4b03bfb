//! stepcast CLI - convert STL meshes to STEP B-rep files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stepcast::{convert_with, ConvertOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepcast")]
#[command(about = "Convert an STL mesh to a STEP B-rep file", long_about = None)]
struct Cli {
    /// Input STL file (binary or ASCII)
    input: PathBuf,

    /// Output STEP file
    output: PathBuf,

    /// Sew tolerance for the B-rep reconstruction
    #[arg(short, long, default_value_t = stepcast::DEFAULT_SEW_TOLERANCE)]
    tolerance: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = ConvertOptions {
        tolerance: cli.tolerance,
        ..Default::default()
    };

    let report = convert_with(&cli.input, &cli.output, &options)
        .with_context(|| format!("converting {}", cli.input.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
