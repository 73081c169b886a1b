//! ReviewLens CLI — LLM analysis of Google Play review exports.
//!
//! Loads review exports, segments them by version and/or language, and has a
//! language model categorize, summarize and compare negative feedback.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
