//! Query parsing and resolution
//!
//! A query has the form `<scheme>://<authority><path>`. Validation only
//! checks that it parses and carries the expected scheme; wildcard
//! placeholders such as `{sample}` pass through untouched because the
//! workflow engine fills them in before any object is built.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Matches `{name}` and `{name,constraint}` placeholders, where the
/// constraint may itself contain `{n}` / `{n,m}` quantifiers.
static WILDCARD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\s*\w+?(?:\s*,\s*(?:[^{}]+|\{\d+(?:,\d+)?\})*)?\s*\}")
        .expect("wildcard pattern is valid")
});

/// Outcome of checking a query against a storage kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryValidation {
    pub query: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QueryValidation {
    fn valid(query: &str) -> Self {
        Self {
            query: query.to_string(),
            valid: true,
            reason: None,
        }
    }

    fn invalid(query: &str, reason: String) -> Self {
        Self {
            query: query.to_string(),
            valid: false,
            reason: Some(reason),
        }
    }

    /// Turn an invalid result into [`Error::InvalidQuery`]
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::InvalidQuery(format!(
                "{} ({})",
                self.query,
                self.reason.unwrap_or_default()
            )))
        }
    }
}

/// Check that `query` parses as a URL whose scheme is `scheme`
pub fn validate_query(query: &str, scheme: &str) -> QueryValidation {
    let parsed = match parse_scheme(query) {
        Ok(parsed) => parsed,
        Err(e) => {
            return QueryValidation::invalid(query, format!("cannot be parsed as URL ({e})"));
        }
    };

    if parsed != scheme {
        return QueryValidation::invalid(query, format!("scheme must be {scheme}"));
    }

    QueryValidation::valid(query)
}

/// Scheme of `query`, lowercased
///
/// The port is not part of the scheme check, so a non-numeric one is let
/// through as written.
fn parse_scheme(query: &str) -> std::result::Result<String, url::ParseError> {
    match Url::parse(query) {
        Ok(url) => Ok(url.scheme().to_string()),
        Err(url::ParseError::InvalidPort) => {
            let (scheme, _) = query
                .split_once(':')
                .ok_or(url::ParseError::RelativeUrlWithoutBase)?;
            Ok(scheme.to_ascii_lowercase())
        }
        Err(e) => Err(e),
    }
}

/// A query split into the parts the storage object needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    query: String,
    scheme: String,
    authority: String,
    path: String,
}

impl ResolvedQuery {
    /// Split a query into scheme, authority and path
    ///
    /// No I/O happens here. Authority and path are taken from the query text
    /// as written: nothing is percent-decoded and `.`/`..` segments stay.
    /// Anything from the first `?` or `#` on is dropped. Fails only for
    /// strings that [`validate_query`] would already have rejected.
    pub fn parse(query: &str) -> Result<Self> {
        let scheme = parse_scheme(query)
            .map_err(|e| Error::InvalidQuery(format!("{query} (cannot be parsed as URL ({e}))")))?;

        let rest = query.split_once(':').map(|(_, rest)| rest).unwrap_or_default();
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (authority, path) = match rest.strip_prefix("//") {
            Some(hier) => hier.split_at(hier.find('/').unwrap_or(hier.len())),
            None => ("", rest),
        };

        Ok(Self {
            query: query.to_string(),
            scheme,
            authority: authority.to_string(),
            path: path.to_string(),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host part, empty for `scheme:///absolute/path` queries
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Authority and path concatenated
    pub fn local_suffix(&self) -> String {
        format!("{}{}", self.authority, self.path)
    }

    /// Where the object lives, as seen from this host
    pub fn query_path(&self) -> PathBuf {
        PathBuf::from(self.local_suffix())
    }
}

/// Authority plus path of `query`, used to lay out the local working copy
pub fn local_suffix(query: &str) -> Result<String> {
    Ok(ResolvedQuery::parse(query)?.local_suffix())
}

/// The part of `pattern` before its first wildcard placeholder
pub fn constant_prefix(pattern: &str) -> &str {
    match WILDCARD_REGEX.find(pattern) {
        Some(m) => &pattern[..m.start()],
        None => pattern,
    }
}

/// Whether `pattern` contains any wildcard placeholder
pub fn has_wildcards(pattern: &str) -> bool {
    WILDCARD_REGEX.is_match(pattern)
}

/// Key under which an object's inventory is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `query` under storage kind `provider`
    pub fn new(provider: &str, query: &str) -> Self {
        Self(format!("{provider}+{query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
