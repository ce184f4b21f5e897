//! The fetch collaborator contract.
//!
//! The engine never talks to a transport directly; it asks a
//! [`RecordFetcher`] for the raw response of a resolved source. The blocking
//! HTTP implementation lives behind the `remote` feature (enabled by
//! default); tests and embedders plug in their own.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A failed fetch, carrying one detail message per underlying error.
///
/// Mirrors the transport's rejection payload shape
/// `{"responseJSON": {"errors": [{"detail": ...}]}}`; each detail becomes a
/// per-field resolution error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    details: Vec<String>,
}

impl FetchFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            details: vec![detail.into()],
        }
    }

    pub fn with_details(details: Vec<String>) -> Self {
        Self { details }
    }

    /// Parse the transport's rejection payload; falls back to a single
    /// generic detail when the shape doesn't match.
    pub fn from_response_json(body: &Value) -> Self {
        let errors = body
            .pointer("/responseJSON/errors")
            .or_else(|| body.pointer("/errors"))
            .and_then(Value::as_array);

        let details: Vec<String> = errors
            .map(|list| {
                list.iter()
                    .filter_map(|e| e.get("detail").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if details.is_empty() {
            Self::new("request failed")
        } else {
            Self { details }
        }
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.details.join("; "))
    }
}

impl std::error::Error for FetchFailure {}

/// Performs the remote request for a resolved dynamic source.
pub trait RecordFetcher {
    /// Fetch `url` with `query` parameters, returning the raw JSON response.
    fn request(&self, url: &str, query: &BTreeMap<String, String>)
        -> Result<Value, FetchFailure>;
}

/// Blocking HTTP fetcher.
#[cfg(feature = "remote")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    pub fn new() -> Result<Self, FetchFailure> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FetchFailure::new(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl RecordFetcher for HttpFetcher {
    fn request(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> Result<Value, FetchFailure> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| FetchFailure::new(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // error bodies may carry the structured rejection payload
            let body: Value = response.json().unwrap_or(Value::Null);
            if body.is_null() {
                return Err(FetchFailure::new(format!("request failed: {}", status)));
            }
            return Err(FetchFailure::from_response_json(&body));
        }

        response.json().map_err(|e| FetchFailure::new(e.to_string()))
    }
}
