use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use fishmetry_common::{BatchOptions, CalibrationFactor, LabelMode};

use fishmetry::batch;

/// Batch-measure fish body dimensions from a folder of photographs
#[derive(Parser, Debug)]
#[command(name = "fishmetry")]
#[command(about = "Measure fish dimensions from photos using a px/cm calibration factor", long_about = None)]
struct Args {
    /// Input directory containing the photographs
    #[arg(short, long)]
    input: Option<String>,

    /// Output directory for annotated images and the CSV report
    #[arg(short, long)]
    output: Option<String>,

    /// Calibration factor in pixels per centimeter (comma or period decimals)
    #[arg(short, long)]
    factor: Option<String>,

    /// Label placement on the overlay images
    #[arg(short, long, value_enum, default_value = "smart")]
    labels: LabelArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LabelArg {
    Smart,
    Fixed,
}

impl From<LabelArg> for LabelMode {
    fn from(arg: LabelArg) -> Self {
        match arg {
            LabelArg::Smart => LabelMode::Smart,
            LabelArg::Fixed => LabelMode::Fixed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Fishmetry - Fish Biometrics Tool");
    println!("================================");

    let input = resolve(args.input, "1. Photo directory:\n>> ")?;
    let output = resolve(args.output, "\n2. Output directory:\n>> ")?;
    let factor_raw = resolve(args.factor, "\n3. Factor (px/cm) [e.g. 75.87]:\n>> ")?;

    // An invalid factor aborts before any filesystem work
    let Some(factor) = CalibrationFactor::parse(&factor_raw) else {
        bail!("invalid calibration factor {:?}: must be a positive number of px/cm", factor_raw);
    };

    let options = BatchOptions {
        label_mode: args.labels.into(),
        ..BatchOptions::default()
    };

    println!();
    println!("Input: {}", input);
    println!("Output: {}", output);
    println!("Factor: {} px/cm", factor);

    batch::run_batch(Path::new(&input), Path::new(&output), factor, &options)?;

    Ok(())
}

/// Use the flag value when given, otherwise prompt the operator
fn resolve(arg: Option<String>, prompt_msg: &str) -> Result<String> {
    match arg {
        Some(value) => Ok(value),
        None => prompt(prompt_msg),
    }
}

/// Read one line from stdin, trimming whitespace and stray shell quotes
/// left over from drag-and-drop paths
fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().replace(['"', '\''], ""))
}
