//! rstore - inventory and transfer for rsync-reachable workflow storage

mod commands;
mod exit_code;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

/// Inventory, list and transfer objects addressed by rsync:// queries
#[derive(Parser, Debug)]
#[command(name = "rstore", version, about, long_about = None)]
struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose logging to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let code = match cli.command {
        Commands::Completions(args) => {
            clap_complete::generate(
                args.shell,
                &mut Cli::command(),
                "rstore",
                &mut std::io::stdout(),
            );
            ExitCode::Success
        }
        command => commands::execute(command, output_config).await,
    };

    std::process::exit(code.code());
}
