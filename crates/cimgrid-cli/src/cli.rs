use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cimgrid", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a CGMES equipment document into a bus-branch network
    Convert {
        /// Input document (JSON property bags)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Write the network here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Conversion options (TOML); defaults apply to absent keys
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Write the conversion report (stats and issues) as JSON
        #[arg(long, value_hint = ValueHint::FilePath)]
        diagnostics: Option<PathBuf>,
        /// Fail if any equipment was rejected as invalid
        #[arg(long)]
        strict: bool,
        /// Print every reported issue
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the default conversion options as TOML
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
