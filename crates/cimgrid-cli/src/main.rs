use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use cimgrid_cli::cli::{Cli, Commands};
use commands::convert::ConvertArgs;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so the network can be piped from stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    let result = match &cli.command {
        Some(Commands::Convert {
            input,
            output,
            config,
            diagnostics,
            strict,
            verbose,
        }) => commands::convert::handle(&ConvertArgs {
            input: input.as_path(),
            output: output.as_deref(),
            config: config.as_deref(),
            diagnostics: diagnostics.as_deref(),
            strict: *strict,
            verbose: *verbose,
        }),
        Some(Commands::Config { out }) => commands::config::handle(out.as_deref()),
        None => {
            info!("No subcommand provided. Use `cimgrid --help` for more information.");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
