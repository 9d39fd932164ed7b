use std::error::Error as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

use super::request::{RequestBody, RequestSpec};
use super::response::{CallResult, Failure, FailureKind, RawResponse};

/// The system under test. Implemented over real HTTP by [`HttpRemote`] and
/// in memory by [`crate::fake::InMemoryPetstore`].
///
/// Implementations report transport-level problems as `Err(Failure)`.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn send(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, Failure>;

    /// Human-readable target for logs and reports.
    fn describe(&self) -> String;
}

pub fn build_headers<'a>(
    input: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|err| HarnessError::InvalidHeaderName {
                key: key.clone(),
                reason: err.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|err| HarnessError::InvalidHeaderValue {
                key: key.clone(),
                reason: err.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// A live endpoint reached through `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| HarnessError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;

        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(config.max_workers.max(1));

        if !config.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(HarnessError::ClientBuild)?;
        Ok(Self { client, base_url })
    }

    fn url_for(&self, spec: &RequestSpec) -> String {
        format!("{}{}", self.base_url, spec.path())
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn send(&self, spec: &RequestSpec) -> std::result::Result<RawResponse, Failure> {
        let headers = build_headers(spec.headers())
            .map_err(|err| Failure::transport(err.to_string()))?;

        let mut request = self
            .client
            .request(spec.method().into(), self.url_for(spec))
            .headers(headers)
            .timeout(spec.timeout());

        if !spec.query().is_empty() {
            request = request.query(spec.query());
        }

        request = match spec.body() {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Raw(raw)) => request.body(raw.clone()),
            Some(RequestBody::Form(fields)) => request.form(fields),
            None => request,
        };

        let response = request.send().await.map_err(|err| classify_reqwest_error(&err))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|err| classify_reqwest_error(&err))?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Map a `reqwest` error onto the failure taxonomy, keeping the full source
/// chain in the message.
fn classify_reqwest_error(err: &reqwest::Error) -> Failure {
    let causes = source_chain(err);
    let detail = if causes.is_empty() {
        err.to_string()
    } else {
        format!("{err}: {causes}")
    };
    if err.is_timeout() {
        return Failure::timeout(detail);
    }

    // The top-level message embeds the request URL, so only the sources are matched.
    let cause = transport_cause(&causes, err.is_connect(), err.is_body() || err.is_decode());
    Failure::transport(format!("{cause}: {detail}"))
}

fn transport_cause(causes: &str, is_connect: bool, is_body: bool) -> &'static str {
    let lowered = causes.to_ascii_lowercase();
    if lowered.contains("dns") || lowered.contains("failed to lookup address") {
        "dns"
    } else if lowered.contains("tls") || lowered.contains("ssl") || lowered.contains("certificate")
    {
        "tls"
    } else if is_connect {
        "connect"
    } else if is_body {
        "read"
    } else {
        "request"
    }
}

fn source_chain(err: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

/// Runs one request spec against a [`Remote`] and always produces a
/// [`CallResult`]; transport problems and timeouts come back as data.
#[derive(Clone)]
pub struct Executor {
    remote: Arc<dyn Remote>,
}

impl Executor {
    pub fn new(remote: Arc<dyn Remote>) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &Arc<dyn Remote> {
        &self.remote
    }

    pub async fn execute(&self, spec: &RequestSpec) -> CallResult {
        let started = Instant::now();
        let outcome = tokio::time::timeout(spec.timeout(), self.remote.send(spec)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => CallResult::failed(Failure::timeout(format!(
                "no response within {}ms",
                spec.timeout().as_millis()
            ))),
            Ok(Err(failure)) => CallResult::failed(failure),
            Ok(Ok(raw)) => CallResult::from_raw(raw),
        };

        match &result.error {
            Some(failure) if failure.kind != FailureKind::MalformedBody => tracing::debug!(
                request = %spec.label(),
                elapsed_ms,
                kind = %failure.kind,
                message = %failure.message,
                "request failed"
            ),
            _ => tracing::debug!(
                request = %spec.label(),
                elapsed_ms,
                status = result.status_code,
                "request completed"
            ),
        }

        result
    }
}
