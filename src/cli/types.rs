//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::evaluate::EvaluateArgs;

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(about = "Arbiter - score recorded coding-agent sessions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .arbiter/config.yaml and .arbiter/local.yaml)
    #[arg(short, long, global = true, env = "ARBITER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one recorded session
    Evaluate(EvaluateArgs),
}
