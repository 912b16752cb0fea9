//! Command line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "taskboard", version, about = "Read-only dashboard API for Redis job queues")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Path to a YAML config file
    #[arg(short, long, env = "TASKBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on, overriding api.port
    #[arg(short, long)]
    pub port: Option<u16>,
}
