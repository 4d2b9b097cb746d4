//! stat command - inventory one or more objects
//!
//! All queries are inventoried concurrently into one shared cache, the same
//! way a workflow engine batches lookups.

use clap::Args;
use futures::future::join_all;
use humansize::{BINARY, format_size};
use rstore_core::{InventoryCache, StorageObject};
use rstore_rsync::{RsyncObject, RsyncProvider};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Inventory objects
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Queries to inventory
    #[arg(required = true)]
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatEntry {
    query: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    objects: Vec<StatEntry>,
}

pub async fn execute(args: StatArgs, provider: RsyncProvider, formatter: &Formatter) -> ExitCode {
    let mut objects: Vec<RsyncObject> = Vec::with_capacity(args.queries.len());
    for query in &args.queries {
        // Nothing is transferred, so the working path is irrelevant
        match provider.object(query, "") {
            Ok(object) => objects.push(object),
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::from_error(&e);
            }
        }
    }

    let cache = InventoryCache::new();
    let results = join_all(objects.iter().map(|o| o.inventory(&cache))).await;

    let mut entries = Vec::with_capacity(objects.len());
    for (object, result) in objects.iter().zip(results) {
        if let Err(e) = result {
            formatter.error(&format!("{}: {e}", object.query()));
            return ExitCode::from_error(&e);
        }

        let key = object.cache_key();
        let size = cache.size(&key);
        entries.push(StatEntry {
            query: object.query().to_string(),
            exists: cache.exists_in_storage(&key).unwrap_or(false),
            size_bytes: size,
            size_human: size.map(|s| format_size(s, BINARY)),
            mtime: cache.mtime(&key).map(|m| m.storage.to_string()),
        });
    }

    if formatter.is_json() {
        formatter.json(&StatOutput { objects: entries });
        return ExitCode::Success;
    }

    for entry in &entries {
        formatter.println(&formatter.style_name(&entry.query));
        if !entry.exists {
            formatter.println(&format!(
                "  {} {}",
                formatter.style_key("exists:"),
                formatter.style_missing("no")
            ));
            continue;
        }
        formatter.println(&format!("  {} yes", formatter.style_key("exists:")));
        if let Some(size) = &entry.size_human {
            formatter.println(&format!(
                "  {} {}",
                formatter.style_key("size:  "),
                formatter.style_size(size)
            ));
        }
        if let Some(mtime) = &entry.mtime {
            formatter.println(&format!(
                "  {} {}",
                formatter.style_key("mtime: "),
                formatter.style_date(mtime)
            ));
        }
    }
    ExitCode::Success
}
