//! CLI subcommands

mod ls;
mod stat;
mod transfer;
mod validate;

use anyhow::Context;
use clap::Subcommand;
use rstore_core::ConfigManager;
use rstore_rsync::RsyncProvider;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// rstore subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether queries are valid rsync queries
    Validate(validate::ValidateArgs),

    /// Show example queries
    Examples,

    /// Inventory objects: existence, size and modification time
    Stat(stat::StatArgs),

    /// Copy an object to its local working path
    Get(transfer::TransferArgs),

    /// Copy the local working path to the object
    Put(transfer::TransferArgs),

    /// Remove an object from storage
    Rm(transfer::QueryArgs),

    /// Set an object's modification time to now
    Touch(transfer::QueryArgs),

    /// List candidate matches for a (wildcard) query
    Ls(transfer::QueryArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `completions` command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

/// Execute a subcommand
pub async fn execute(command: Commands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    match command {
        Commands::Validate(args) => validate::execute(args, &formatter),
        Commands::Examples => validate::execute_examples(&formatter),
        Commands::Stat(args) => with_provider(&formatter, |p| stat::execute(args, p, &formatter)).await,
        Commands::Get(args) => {
            with_provider(&formatter, |p| transfer::execute_get(args, p, &formatter)).await
        }
        Commands::Put(args) => {
            with_provider(&formatter, |p| transfer::execute_put(args, p, &formatter)).await
        }
        Commands::Rm(args) => {
            with_provider(&formatter, |p| transfer::execute_rm(args, p, &formatter)).await
        }
        Commands::Touch(args) => {
            with_provider(&formatter, |p| transfer::execute_touch(args, p, &formatter)).await
        }
        Commands::Ls(args) => with_provider(&formatter, |p| ls::execute(args, p, &formatter)).await,
        // Handled in main, where the clap command is available
        Commands::Completions(_) => ExitCode::Success,
    }
}

/// Load the config and build a provider, or report why not
fn load_provider() -> anyhow::Result<RsyncProvider> {
    let manager = ConfigManager::new().context("Failed to locate config directory")?;
    let config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;
    tracing::debug!(
        config_dir = %manager.config_dir().display(),
        program = %config.rsync.program,
        max_attempts = config.retry.max_attempts,
        "Loaded config"
    );
    Ok(RsyncProvider::new(config))
}

async fn with_provider<F, Fut>(formatter: &Formatter, run: F) -> ExitCode
where
    F: FnOnce(RsyncProvider) -> Fut,
    Fut: std::future::Future<Output = ExitCode>,
{
    match load_provider() {
        Ok(provider) => run(provider).await,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            ExitCode::GeneralError
        }
    }
}
