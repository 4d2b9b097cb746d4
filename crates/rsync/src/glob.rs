//! Candidate listing for wildcard queries
//!
//! Narrows a query to its constant prefix and lists what lives there. The
//! wildcard pattern itself is matched by the caller.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rstore_core::{Error, Result, constant_prefix};
use walkdir::WalkDir;

/// Concrete paths under the constant prefix of `pattern`
///
/// If the prefix is a directory, every entry beneath it (recursively, not
/// following symlinks, excluding the directory itself) is returned.
/// Otherwise the prefix is the only candidate. Directories that cannot be
/// read are skipped. Recomputed on every call.
pub async fn list_candidates(pattern: &str) -> Result<Vec<String>> {
    let prefix = PathBuf::from(constant_prefix(pattern));

    tokio::task::spawn_blocking(move || list_blocking(&prefix))
        .await
        .map_err(|e| Error::General(format!("candidate listing task failed: {e}")))?
}

fn list_blocking(prefix: &Path) -> Result<Vec<String>> {
    let relative = prefix.as_os_str().is_empty();
    let root = if relative { Path::new(".") } else { prefix };

    if !root.is_dir() {
        return Ok(vec![prefix.to_string_lossy().into_owned()]);
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e)
                if e.io_error().map(std::io::Error::kind) == Some(ErrorKind::PermissionDenied) =>
            {
                tracing::warn!(path = ?e.path(), error = %e, "Skipping unreadable entry");
                continue;
            }
            Err(e) => return Err(Error::Io(e.into())),
        };
        let path = if relative {
            entry.path().strip_prefix(".").unwrap_or(entry.path())
        } else {
            entry.path()
        };
        candidates.push(path.to_string_lossy().into_owned());
    }

    tracing::debug!(
        prefix = %prefix.display(),
        count = candidates.len(),
        "Listed candidate matches"
    );
    Ok(candidates)
}
