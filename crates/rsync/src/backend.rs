//! rsync transfer backend
//!
//! Runs the external `rsync` program. The process is spawned, awaited and
//! reaped within each call; `kill_on_drop` makes sure a cancelled future
//! does not leave it running.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use rstore_core::{Error, Result, RsyncConfig, TransferBackend};
use tokio::process::Command;

/// [`TransferBackend`] that shells out to rsync
#[derive(Debug, Clone)]
pub struct RsyncBackend {
    program: String,
    options: Vec<String>,
}

impl RsyncBackend {
    pub fn new(config: &RsyncConfig) -> Self {
        Self {
            program: config.program.clone(),
            options: config.options.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Copy `source` to `dest` with the configured options
    async fn copy(&self, source: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut args: Vec<OsString> = self.options.iter().map(OsString::from).collect();
        args.push(source_arg(source).await);
        args.push(dest.as_os_str().to_owned());

        self.run(&args).await
    }

    async fn run(&self, args: &[OsString]) -> Result<()> {
        let command = render_command(&self.program, args);
        tracing::info!(command = %command, "Running transfer");

        // stdout and stderr share one pipe so the output keeps the order the
        // tool wrote it in
        let (mut reader, writer) = std::io::pipe()?;
        let mut child = {
            let mut cmd = Command::new(&self.program);
            cmd.args(args)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer)
                .kill_on_drop(true);
            cmd.spawn().map_err(|e| Error::Spawn {
                program: self.program.clone(),
                source: e,
            })?
        };

        let collect = tokio::task::spawn_blocking(move || {
            let mut captured = Vec::new();
            reader.read_to_end(&mut captured).map(|_| captured)
        });
        let status = child.wait().await?;
        let captured = collect
            .await
            .map_err(|e| Error::General(format!("output capture task failed: {e}")))??;

        if status.success() {
            tracing::debug!(command = %command, "Transfer finished");
            return Ok(());
        }

        Err(Error::Transfer {
            command,
            status: status.to_string(),
            output: String::from_utf8_lossy(&captured).into_owned(),
        })
    }
}

impl Default for RsyncBackend {
    fn default() -> Self {
        Self::new(&RsyncConfig::default())
    }
}

#[async_trait]
impl TransferBackend for RsyncBackend {
    async fn retrieve(&self, remote: &Path, local: &Path) -> Result<()> {
        self.copy(remote, local).await
    }

    async fn store(&self, local: &Path, remote: &Path) -> Result<()> {
        self.copy(local, remote).await
    }

    /// Deletes by syncing an empty directory into the parent with a filter
    /// that only lets the object's own name through.
    async fn remove(&self, remote: &Path) -> Result<()> {
        match tokio::fs::symlink_metadata(remote).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %remote.display(), "Nothing to remove");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        let name = remote
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| {
                Error::UnsupportedOperation(format!("cannot remove {}", remote.display()))
            })?;
        let parent = match remote.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let empty = tempfile::TempDir::new()?;
        let pattern = escape_pattern(name);
        let args = vec![
            OsString::from("-r"),
            OsString::from("--delete"),
            OsString::from(format!("--include=/{pattern}")),
            OsString::from(format!("--include=/{pattern}/***")),
            OsString::from("--exclude=*"),
            with_trailing_slash(empty.path().as_os_str()),
            with_trailing_slash(parent.as_os_str()),
        ];

        self.run(&args).await
    }
}

/// Directories are copied by contents so the destination mirrors the source
async fn source_arg(source: &Path) -> OsString {
    let is_dir = tokio::fs::metadata(source)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if is_dir {
        with_trailing_slash(source.as_os_str())
    } else {
        source.as_os_str().to_owned()
    }
}

fn with_trailing_slash(path: &OsStr) -> OsString {
    let mut arg = path.to_owned();
    if !path.to_string_lossy().ends_with('/') {
        arg.push("/");
    }
    arg
}

/// Escape rsync filter wildcards so names match literally
fn escape_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '*' | '?' | '[' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn render_command(program: &str, args: &[OsString]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
