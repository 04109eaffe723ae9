// RPC reads: search by name/description, search by maintainer and exact
// info lookup. All three answer with the `{type, results}` envelope.

use super::transport::Transport;
use super::{form_value, ApiClient};
use crate::error::{AurError, Result};
use crate::package::{sort_packages, Package, SortField};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

/// "No results found" is how the service says "empty", not a failure.
static NO_RESULTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\ANo results? founds?\n?\z").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Search,
    MaintainerSearch,
    Info,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Search => "search",
            QueryKind::MaintainerSearch => "msearch",
            QueryKind::Info => "info",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    results: Value,
}

impl<T: Transport> ApiClient<T> {
    /// Search package names and descriptions.
    pub fn search(&self, term: &str, sort: Option<SortField>) -> Result<Vec<Package>> {
        self.list_query(QueryKind::Search, term, sort)
    }

    /// List packages maintained by `term`.
    pub fn maintainer_search(&self, term: &str, sort: Option<SortField>) -> Result<Vec<Package>> {
        self.list_query(QueryKind::MaintainerSearch, term, sort)
    }

    /// Look up one package by exact name or numeric id.
    pub fn info(&self, term: &str) -> Result<Option<Package>> {
        let body = self.rpc(QueryKind::Info, term)?;
        Ok(decode_envelope(QueryKind::Info, &body)?.into_iter().next())
    }

    fn list_query(
        &self,
        kind: QueryKind,
        term: &str,
        sort: Option<SortField>,
    ) -> Result<Vec<Package>> {
        let body = self.rpc(kind, term)?;
        let mut packages = decode_envelope(kind, &body)?;
        if let Some(field) = sort {
            sort_packages(&mut packages, field);
        }
        Ok(packages)
    }

    fn rpc(&self, kind: QueryKind, term: &str) -> Result<Vec<u8>> {
        let path = format!("/rpc.php?type={}&arg={}", kind.as_str(), form_value(term));
        Ok(self.get(&path)?.body)
    }
}

/// Decode an RPC envelope into normalized packages. An empty vector means
/// the service found nothing.
pub fn decode_envelope(kind: QueryKind, body: &[u8]) -> Result<Vec<Package>> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| AurError::BadResponse(format!("malformed envelope: {e}")))?;

    if envelope.kind == kind.as_str() {
        return match envelope.results {
            Value::Array(records) => records.into_iter().map(Package::from_json).collect(),
            record @ Value::Object(_) => Ok(vec![Package::from_json(record)?]),
            other => Err(AurError::BadResponse(format!(
                "unexpected {} results: {other}",
                kind.as_str()
            ))),
        };
    }

    if envelope.kind == "error" {
        let message = match &envelope.results {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if NO_RESULTS.is_match(&message) {
            return Ok(Vec::new());
        }
        return Err(AurError::BadResponse(message));
    }

    Err(AurError::BadResponse(format!(
        "expected a '{}' envelope, got '{}'",
        kind.as_str(),
        envelope.kind
    )))
}
