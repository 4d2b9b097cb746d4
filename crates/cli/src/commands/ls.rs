//! ls command - list candidate matches of a query

use rstore_core::{StorageObject, has_wildcards};
use rstore_rsync::RsyncProvider;
use serde::Serialize;

use super::transfer::QueryArgs;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Debug, Serialize)]
struct LsOutput {
    query: String,
    wildcards: bool,
    candidates: Vec<String>,
    total_count: usize,
}

pub async fn execute(args: QueryArgs, provider: RsyncProvider, formatter: &Formatter) -> ExitCode {
    let object = match provider.object(&args.query, "") {
        Ok(o) => o,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let mut candidates = match object.list_candidate_matches().await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("{}: {e}", args.query));
            return ExitCode::from_error(&e);
        }
    };
    candidates.sort();

    if formatter.is_json() {
        formatter.json(&LsOutput {
            query: args.query.clone(),
            wildcards: has_wildcards(&args.query),
            total_count: candidates.len(),
            candidates,
        });
    } else {
        for candidate in &candidates {
            formatter.println(candidate);
        }
    }
    ExitCode::Success
}
