//! validate / examples commands

use clap::Args;
use rstore_core::{QueryValidation, StorageProvider};
use rstore_rsync::RsyncProvider;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Check queries without touching storage
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Queries to check (e.g. rsync:///data/{sample}.txt)
    #[arg(required = true)]
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    results: Vec<QueryValidation>,
    all_valid: bool,
}

/// Validation needs no config, so the default provider is enough
pub fn execute(args: ValidateArgs, formatter: &Formatter) -> ExitCode {
    let provider = RsyncProvider::default();
    let results: Vec<QueryValidation> = args
        .queries
        .iter()
        .map(|q| provider.is_valid_query(q))
        .collect();
    let all_valid = results.iter().all(|r| r.valid);

    if formatter.is_json() {
        formatter.json(&ValidateOutput { results, all_valid });
    } else {
        for result in &results {
            let query = formatter.style_name(&result.query);
            if result.valid {
                formatter.println(&format!("{query}: valid"));
            } else {
                let reason = formatter.style_missing(result.reason.as_deref().unwrap_or("invalid"));
                formatter.println(&format!("{query}: {reason}"));
            }
        }
    }

    if all_valid {
        ExitCode::Success
    } else {
        ExitCode::UsageError
    }
}

pub fn execute_examples(formatter: &Formatter) -> ExitCode {
    let examples = RsyncProvider::default().example_queries();

    if formatter.is_json() {
        formatter.json(&serde_json::json!({ "examples": examples }));
    } else {
        for example in &examples {
            formatter.println(&format!(
                "{}  {}",
                formatter.style_name(&example.query),
                formatter.style_date(&example.description)
            ));
        }
    }
    ExitCode::Success
}
