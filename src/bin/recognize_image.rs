use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use rusty_hands::config::AppConfig;
use rusty_hands::inference::HandGesturePipeline;
use rusty_hands::recognizer::GestureRecognizer;

/// Run gesture recognition on still images and print ranked gestures per hand.
#[derive(Parser, Debug)]
struct Cli {
    /// Image files (any format the image crate reads)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    #[arg(long, default_value = AppConfig::DEFAULT_PATH)]
    config: PathBuf,

    /// How many gestures to print per hand
    #[arg(long, default_value_t = 3)]
    top: usize,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    rusty_hands::logging::init_logging(cli.verbose)?;

    let config = AppConfig::load(&cli.config)?;
    let pipeline = HandGesturePipeline::new(&config.models)?;
    let mut recognizer = GestureRecognizer::new(pipeline, config.models.max_hands);

    // Each image is its own video frame, 33ms apart.
    for (i, path) in cli.images.iter().enumerate() {
        let frame = image::open(path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .to_rgb8();

        println!("{} ({}x{})", path.display().to_string().bold(), frame.width(), frame.height());
        let Some(result) = recognizer.recognize(&frame, i as u64 * 33)? else {
            println!("  {}", "empty frame".yellow());
            continue;
        };
        if result.is_empty() {
            println!("  {}", "no hands".yellow());
            continue;
        }

        for (hand, gestures) in result.gestures().iter().enumerate() {
            println!("  hand {}", hand);
            for g in gestures.iter().take(cli.top) {
                println!("    {:<14} {:>5.1}%", g.category_name.cyan(), g.score * 100.0);
            }
        }
    }
    Ok(())
}
