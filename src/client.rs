//! Normalized request/response handling shared by every API helper.
//!
//! All requests are issued through the [`GooseUser`] so the runtime
//! tracks them, then flattened into an [`ApiResponse`]: a status code
//! (0 when no response arrived at all), the raw body text, the response
//! headers, and the elapsed time. Non-2xx statuses and unparseable
//! bodies are ordinary results to inspect, never errors.

use std::time::{Duration, Instant};

use futures::future::join_all;
use goose::goose::{GooseResponse, TransactionError};
use goose::metrics::GooseRequestMetric;
use goose::prelude::*;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;

/// A response flattened into the shape scenario checks operate over.
pub struct ApiResponse {
    /// HTTP status code; 0 encodes a transport-level non-response.
    pub status: u16,
    /// Raw body text; empty when the body could not be read.
    pub body: String,
    /// Response headers, when a response arrived.
    pub headers: Option<HeaderMap>,
    /// Elapsed milliseconds as recorded by the runtime.
    pub response_time: u64,
    /// The runtime's request metric, needed to record check outcomes.
    pub metric: GooseRequestMetric,
}

impl ApiResponse {
    /// Attempt to parse the body as JSON. Parse failure is contained
    /// here and yields `None`; it never propagates.
    pub fn json(&self) -> Option<Value> {
        parse_body(&self.body)
    }

    pub fn outcome(&self) -> Outcome {
        classify(self.status)
    }
}

/// Tolerant JSON parse: a malformed body is a check failure for the
/// caller to record, not a fault.
pub fn parse_body(body: &str) -> Option<Value> {
    serde_json::from_str(body).ok()
}

/// Three-way response classification used by the spike scenarios.
///
/// A 429 means the target refused load it could not absorb, which is an
/// acceptable outcome while spiking. A 5xx or a missing response means
/// the target failed, which never is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Degraded,
    Failure,
}

pub fn classify(status: u16) -> Outcome {
    match status {
        0 => Outcome::Failure,
        429 => Outcome::Degraded,
        100..=399 => Outcome::Success,
        _ => Outcome::Failure,
    }
}

/// Perform one tracked request and normalize the result.
///
/// `body` is sent as JSON when present; `token` is attached as a
/// `Authorization: Token <value>` header. All status codes are valid
/// results: callers inspect `ApiResponse::status`.
pub async fn send(
    user: &mut GooseUser,
    method: GooseMethod,
    path: &str,
    name: &str,
    body: Option<&Value>,
    token: Option<&str>,
) -> Result<ApiResponse, Box<TransactionError>> {
    let mut builder = user.get_request_builder(&method, path)?;
    if let Some(json) = body {
        builder = builder.json(json);
    }
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Token {}", token));
    }

    let request = GooseRequest::builder()
        .method(method)
        .name(name)
        .set_request_builder(builder)
        .build();

    let goose = user.request(request).await?;
    Ok(normalize(goose).await)
}

/// Flatten a [`GooseResponse`] into an [`ApiResponse`]. A transport
/// error (timeout, refused connection) becomes status 0 with an empty
/// body so downstream checks evaluate false instead of unwinding.
async fn normalize(goose: GooseResponse) -> ApiResponse {
    let metric = goose.request;
    match goose.response {
        Ok(response) => {
            let status = response.status().as_u16();
            let headers = Some(response.headers().clone());
            let body = response.text().await.unwrap_or_default();
            ApiResponse {
                status,
                body,
                headers,
                response_time: metric.response_time,
                metric,
            }
        }
        Err(_) => ApiResponse {
            status: 0,
            body: String::new(),
            headers: None,
            response_time: metric.response_time,
            metric,
        },
    }
}

/// Record a named boolean check against a response.
///
/// A failed check updates the request's metric with the check name and
/// returns; it never aborts the iteration. Callers that need to branch
/// on the outcome inspect the response directly.
pub fn check(user: &mut GooseUser, response: &mut ApiResponse, name: &str, pass: bool) {
    if !pass {
        let _ = user.set_failure(
            name,
            &mut response.metric,
            response.headers.as_ref(),
            Some(response.body.as_str()),
        );
    }
}

/// Record a spike-mode check: 429 is reclassified as a success in the
/// runtime's metrics, anything the target failed outright stays a
/// failure.
pub fn check_spike(user: &mut GooseUser, response: &mut ApiResponse, name: &str) -> Outcome {
    let outcome = classify(response.status);
    match outcome {
        Outcome::Success => {}
        Outcome::Degraded => {
            // The runtime marked the 429 as failed when it came in.
            let _ = user.set_success(&mut response.metric);
        }
        Outcome::Failure => {
            let _ = user.set_failure(
                name,
                &mut response.metric,
                response.headers.as_ref(),
                Some(response.body.as_str()),
            );
        }
    }
    outcome
}

/// One request in a batched fan-out.
pub struct BatchSpec {
    pub method: reqwest::Method,
    pub path: String,
}

impl BatchSpec {
    pub fn get(path: impl Into<String>) -> Self {
        BatchSpec {
            method: reqwest::Method::GET,
            path: path.into(),
        }
    }
}

/// One reply from a batched fan-out, in submission order.
pub struct BatchReply {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

/// Issue every request in `specs` concurrently through the user's own
/// HTTP client and collect the replies in submission order.
///
/// Individual failures surface as status 0 replies; the batch itself
/// always completes. These requests are timed locally and do not appear
/// in the runtime's per-request tables.
pub async fn batch(
    user: &GooseUser,
    specs: &[BatchSpec],
) -> Result<Vec<BatchReply>, Box<TransactionError>> {
    let mut pending = Vec::with_capacity(specs.len());
    for spec in specs {
        let url = user.build_url(&spec.path)?;
        let client = user.client.clone();
        let method = spec.method.clone();
        pending.push(async move {
            let started = Instant::now();
            match client.request(method, url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    BatchReply {
                        status,
                        body,
                        elapsed: started.elapsed(),
                    }
                }
                Err(_) => BatchReply {
                    status: 0,
                    body: String::new(),
                    elapsed: started.elapsed(),
                },
            }
        });
    }

    Ok(join_all(pending).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_spike_outcomes() {
        // The three classes named by the spike semantics.
        assert_eq!(classify(429), Outcome::Degraded);
        assert_eq!(classify(500), Outcome::Failure);
        assert_eq!(classify(503), Outcome::Failure);
        assert_eq!(classify(0), Outcome::Failure);

        assert_eq!(classify(200), Outcome::Success);
        assert_eq!(classify(201), Outcome::Success);
        assert_eq!(classify(304), Outcome::Success);
        // Other client errors are our mistake, not acceptable degradation.
        assert_eq!(classify(404), Outcome::Failure);
        assert_eq!(classify(422), Outcome::Failure);
    }

    #[test]
    fn malformed_bodies_parse_to_none() {
        assert!(parse_body("{\"articles\": []}").is_some());
        assert!(parse_body("<html>502 Bad Gateway</html>").is_none());
        assert!(parse_body("").is_none());
        assert!(parse_body("{\"truncated\":").is_none());
    }
}
