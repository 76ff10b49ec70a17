mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dnsvault_core::Engine;

use crate::cli::{Cli, Command};
use crate::error::{CliError, exit_code};

#[tokio::main]
async fn main() {
    // Usage errors exit 1; --help and --version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                exit_code::FAILURE
            } else {
                exit_code::SUCCESS
            };
            std::process::exit(code);
        }
    };

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need an engine
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "dnsvault", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let engine = Engine::new(config::resolve_engine_config(&cli.global)?)?;
            tracing::debug!(command = ?cmd, domain = %engine.config().domain, "dispatching command");
            commands::dispatch(cmd, &engine, &cli.global).await
        }
    }
}
