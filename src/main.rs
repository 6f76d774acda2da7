//! Perceptual Image Similarity CLI Tool
//!
//! Scores generated images against a target picture.

use clap::Parser;
use promptmatch::cli::{run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
