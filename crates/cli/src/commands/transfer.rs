//! get / put / rm / touch commands

use std::path::PathBuf;

use clap::Args;
use rstore_core::StorageObject;
use rstore_rsync::{RsyncObject, RsyncProvider};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Arguments for commands that move bytes
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Object query (rsync://...)
    pub query: String,

    /// Directory holding local working copies
    #[arg(long, default_value = ".rstore")]
    pub local_prefix: PathBuf,
}

/// Arguments for commands acting on a single query
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Object query (rsync://...)
    pub query: String,
}

#[derive(Debug, Serialize)]
struct TransferOutput {
    operation: &'static str,
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_path: Option<String>,
}

fn build_object(
    provider: &RsyncProvider,
    query: &str,
    local_path: PathBuf,
    formatter: &Formatter,
) -> Result<RsyncObject, ExitCode> {
    provider.object(query, local_path).map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from_error(&e)
    })
}

fn working_object(
    args: &TransferArgs,
    provider: &RsyncProvider,
    formatter: &Formatter,
) -> Result<RsyncObject, ExitCode> {
    let local_path = RsyncProvider::local_path_for(&args.local_prefix, &args.query).map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::from_error(&e)
    })?;
    build_object(provider, &args.query, local_path, formatter)
}

fn report(
    formatter: &Formatter,
    operation: &'static str,
    object: &RsyncObject,
    with_local: bool,
    message: String,
) {
    if formatter.is_json() {
        formatter.json(&TransferOutput {
            operation,
            query: object.query().to_string(),
            local_path: with_local.then(|| object.local_path().display().to_string()),
        });
    } else {
        formatter.success(&message);
    }
}

fn failed(formatter: &Formatter, object: &RsyncObject, e: rstore_core::Error) -> ExitCode {
    formatter.error(&format!("{}: {e}", object.query()));
    ExitCode::from_error(&e)
}

pub async fn execute_get(
    args: TransferArgs,
    provider: RsyncProvider,
    formatter: &Formatter,
) -> ExitCode {
    let object = match working_object(&args, &provider, formatter) {
        Ok(o) => o,
        Err(code) => return code,
    };

    match object.exists().await {
        Ok(true) => {}
        Ok(false) => {
            formatter.error(&format!("{}: object does not exist", object.query()));
            return ExitCode::NotFound;
        }
        Err(e) => return failed(formatter, &object, e),
    }

    match object.retrieve().await {
        Ok(()) => {
            let message = format!(
                "{} -> {}",
                formatter.style_name(object.query()),
                formatter.style_name(&object.local_path().display().to_string())
            );
            report(formatter, "get", &object, true, message);
            ExitCode::Success
        }
        Err(e) => failed(formatter, &object, e),
    }
}

pub async fn execute_put(
    args: TransferArgs,
    provider: RsyncProvider,
    formatter: &Formatter,
) -> ExitCode {
    let object = match working_object(&args, &provider, formatter) {
        Ok(o) => o,
        Err(code) => return code,
    };

    if !object.local_path().exists() {
        formatter.error(&format!(
            "Local working copy {} does not exist",
            object.local_path().display()
        ));
        return ExitCode::NotFound;
    }

    match object.store().await {
        Ok(()) => {
            let message = format!(
                "{} -> {}",
                formatter.style_name(&object.local_path().display().to_string()),
                formatter.style_name(object.query())
            );
            report(formatter, "put", &object, true, message);
            ExitCode::Success
        }
        Err(e) => failed(formatter, &object, e),
    }
}

pub async fn execute_rm(args: QueryArgs, provider: RsyncProvider, formatter: &Formatter) -> ExitCode {
    let object = match build_object(&provider, &args.query, PathBuf::new(), formatter) {
        Ok(o) => o,
        Err(code) => return code,
    };

    match object.exists().await {
        Ok(false) => formatter.warning(&format!("{}: nothing to remove", object.query())),
        Ok(true) => {}
        Err(e) => return failed(formatter, &object, e),
    }

    match object.remove().await {
        Ok(()) => {
            let message = format!("Removed {}", formatter.style_name(object.query()));
            report(formatter, "rm", &object, false, message);
            ExitCode::Success
        }
        Err(e) => failed(formatter, &object, e),
    }
}

pub async fn execute_touch(
    args: QueryArgs,
    provider: RsyncProvider,
    formatter: &Formatter,
) -> ExitCode {
    let object = match build_object(&provider, &args.query, PathBuf::new(), formatter) {
        Ok(o) => o,
        Err(code) => return code,
    };

    match object.touch().await {
        Ok(()) => {
            let message = format!("Touched {}", formatter.style_name(object.query()));
            report(formatter, "touch", &object, false, message);
            ExitCode::Success
        }
        Err(e) => failed(formatter, &object, e),
    }
}
