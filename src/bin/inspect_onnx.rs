use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::PathBuf;

/// Print the input and output signatures of ONNX models.
#[derive(Parser, Debug)]
struct Cli {
    /// Model files to inspect
    #[arg(required = true)]
    models: Vec<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn inspect(path: &PathBuf) -> Result<()> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level1)?
        .with_intra_threads(1)?
        .commit_from_file(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    println!("{} {}", "Model:".bold(), path.display());
    println!("  {}", "inputs".green());
    for (i, input) in session.inputs.iter().enumerate() {
        println!("    #{} {:<24} {:?}", i, input.name, input.input_type);
    }
    println!("  {}", "outputs".green());
    for (i, output) in session.outputs.iter().enumerate() {
        println!("    #{} {:<24} {:?}", i, output.name, output.output_type);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    rusty_hands::logging::init_logging(cli.verbose)?;

    for path in &cli.models {
        if let Err(e) = inspect(path) {
            eprintln!("{} {:#}", "error:".red(), e);
        }
    }
    Ok(())
}
