use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "capture-guide")]
#[command(about = "Guided barcode and photo capture for diagnostic test kits")]
#[command(long_about = "Capture Guide walks a camera through an ordered list of steps: scan the kit \
                       barcode, validate its lot number, then photograph the test. Use 'capture-guide demo' \
                       to run the workflow against a simulated camera.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the check digit for a payload
    CheckDigit {
        /// Payload without its check digit
        payload: String,
    },
    /// Validate a code whose last character is its check digit
    Validate {
        /// Code to validate; "0000" is always accepted
        code: String,
    },
    /// Extract and validate the lot number from a kit barcode payload
    Lot {
        /// Comma-separated barcode payload
        payload: String,
    },
    /// Run the two-step kit workflow against a simulated camera
    Demo {
        /// Barcode payload to scan; defaults to a freshly generated valid kit code
        #[arg(long, help = "Kit barcode payload fed to the QR step")]
        payload: Option<String>,
        /// Directory the simulated photos are named under
        #[arg(long, help = "Override the configured demo output directory")]
        output_dir: Option<PathBuf>,
        /// Print the session report as JSON
        #[arg(long, help = "Print the full session report as JSON")]
        json: bool,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(long, help = "Write the effective configuration to a TOML file")]
        save: Option<PathBuf>,
    },
}
