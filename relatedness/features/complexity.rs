use std::{sync::OnceLock, time::Duration};

use regex::Regex;
use reqwest::blocking::Client;

pub use crate::error::ComplexityError;
use crate::record::ComplexityPair;

/// Anything that can score the DRS complexity of a sentence.
pub trait ComplexitySource: Send + Sync {
    /// Complexity of the whitespace-joined `sentence`.
    fn complexity(&self, sentence: &[String]) -> Result<f64, ComplexityError>;
}

/// Client for the semantic parser's raw pipeline endpoint (XML output).
#[derive(Debug, Clone)]
pub struct HttpComplexityService {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpComplexityService {
    /// Creates a client; every request is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ComplexityError> {
        let client = Client::builder()
            .user_agent("relatedness-features/0.1")
            .timeout(timeout)
            .build()
            .map_err(|err| ComplexityError::Unavailable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: &reqwest::Error) -> ComplexityError {
        if err.is_timeout() {
            ComplexityError::Timeout(self.timeout)
        } else {
            ComplexityError::Unavailable(err.to_string())
        }
    }
}

impl ComplexitySource for HttpComplexityService {
    fn complexity(&self, sentence: &[String]) -> Result<f64, ComplexityError> {
        let response = self
            .client
            .post(&self.endpoint)
            .body(sentence.join(" "))
            .send()
            .map_err(|err| self.classify(&err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ComplexityError::Unavailable(format!("status {status}")));
        }
        let body = response.text().map_err(|err| match self.classify(&err) {
            ComplexityError::Unavailable(msg) => ComplexityError::MalformedResponse(msg),
            other => other,
        })?;
        parse_drs_complexity(&body)
    }
}

fn element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<(?:dr|cond)[\s/>]").expect("element pattern is valid"))
}

/// Number of discourse referents (`<dr>`) plus conditions (`<cond>`) in a DRS.
pub fn parse_drs_complexity(xml: &str) -> Result<f64, ComplexityError> {
    if !xml.contains("<drs") {
        let preview: String = xml.chars().take(80).collect();
        return Err(ComplexityError::MalformedResponse(format!(
            "no <drs> element in {preview:?}"
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let elements = element_pattern().find_iter(xml).count() as f64;
    Ok(elements)
}

/// `|c(a) - c(b)|` using the remote source.
pub fn complexity_delta(
    sentence_a: &[String],
    sentence_b: &[String],
    source: &dyn ComplexitySource,
) -> Result<f64, ComplexityError> {
    let a = source.complexity(sentence_a)?;
    let b = source.complexity(sentence_b)?;
    Ok((a - b).abs())
}

/// `|c(a) - c(b)|` from values stored on the record.
#[must_use]
pub fn precomputed_delta(pair: ComplexityPair) -> f64 {
    (pair.premise - pair.hypothesis).abs()
}
