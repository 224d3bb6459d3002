use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera index (overrides the config file)
    #[arg(short, long)]
    pub cam_index: Option<u32>,

    /// Configuration file
    #[arg(long, default_value = AppConfig::DEFAULT_PATH)]
    pub config: PathBuf,

    /// Run with a simulated hand instead of the ONNX models
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// Start with gesture labels visible
    #[arg(long, default_value_t = false)]
    pub show_labels: bool,

    /// List available cameras
    #[arg(long)]
    pub list: bool,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
