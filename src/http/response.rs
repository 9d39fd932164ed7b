use std::fmt::{self, Display};

use bytes::Bytes;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Classification of everything that can go wrong with one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// DNS, connect, TLS, or body-read failure below HTTP.
    TransportFailure,
    /// No response inside the request's timeout.
    Timeout,
    /// A status arrived but the declared JSON body did not parse.
    MalformedBody,
    /// The call completed but an expectation did not hold.
    ContractViolation,
    /// A dispatch faulted in a way none of the above describe.
    UnhandledFailure,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::TransportFailure => "TRANSPORT_FAILURE",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::MalformedBody => "MALFORMED_BODY",
            FailureKind::ContractViolation => "CONTRACT_VIOLATION",
            FailureKind::UnhandledFailure => "UNHANDLED_FAILURE",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransportFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UnhandledFailure, message)
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// What the remote sent back, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn declares_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|value| value.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

/// Best-effort interpretation of a response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Raw(#[serde(serialize_with = "serialize_lossy")] Vec<u8>),
}

fn serialize_lossy<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Normalized outcome of executing one request spec. Constructed once and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub status_code: Option<u16>,
    pub body: Option<ResponseBody>,
    pub error: Option<Failure>,
}

impl CallResult {
    pub fn failed(failure: Failure) -> Self {
        Self {
            status_code: None,
            body: None,
            error: Some(failure),
        }
    }

    /// Interpret a raw response. JSON-declared bodies are parsed; a parse
    /// failure keeps the status and marks the result `MalformedBody`.
    pub fn from_raw(raw: RawResponse) -> Self {
        if raw.body.is_empty() {
            return Self {
                status_code: Some(raw.status),
                body: None,
                error: None,
            };
        }

        if !raw.declares_json() {
            return Self {
                status_code: Some(raw.status),
                body: Some(ResponseBody::Raw(raw.body.to_vec())),
                error: None,
            };
        }

        match serde_json::from_slice::<Value>(&raw.body) {
            Ok(value) => Self {
                status_code: Some(raw.status),
                body: Some(ResponseBody::Json(value)),
                error: None,
            },
            Err(err) => Self {
                status_code: Some(raw.status),
                body: None,
                error: Some(Failure::new(
                    FailureKind::MalformedBody,
                    format!("Failed to parse JSON body: {err}"),
                )),
            },
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Some(ResponseBody::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a dotted path (`category.name`) in a JSON object body.
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(self.json()?, path)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|failure| failure.kind)
    }

    /// Short `status=.. error=..` description for diagnostics.
    pub fn describe(&self) -> String {
        match (&self.status_code, &self.error) {
            (Some(status), None) => format!("status {status}"),
            (Some(status), Some(failure)) => format!("status {status} ({failure})"),
            (None, Some(failure)) => failure.to_string(),
            (None, None) => "no status".to_string(),
        }
    }
}

pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, content_type: Option<&str>, body: &str) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(str::to_string),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn json_body_is_parsed() {
        let result = CallResult::from_raw(raw(
            200,
            Some("application/json; charset=utf-8"),
            r#"{"id":1,"category":{"name":"dog"}}"#,
        ));

        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());
        assert_eq!(result.field("id"), Some(&json!(1)));
        assert_eq!(result.field("category.name"), Some(&json!("dog")));
        assert_eq!(result.field("category.id"), None);
    }

    #[test]
    fn malformed_json_keeps_status() {
        let result = CallResult::from_raw(raw(200, Some("application/json"), "{not json"));

        assert_eq!(result.status_code, Some(200));
        assert!(result.body.is_none());
        assert_eq!(result.failure_kind(), Some(FailureKind::MalformedBody));
    }

    #[test]
    fn non_json_body_is_kept_raw() {
        let result = CallResult::from_raw(raw(415, Some("text/html"), "<html/>"));

        assert_eq!(result.status_code, Some(415));
        assert_eq!(result.body, Some(ResponseBody::Raw(b"<html/>".to_vec())));
        assert!(result.json().is_none());
    }

    #[test]
    fn empty_body_has_no_error_marker() {
        let result = CallResult::from_raw(RawResponse::empty(404));

        assert_eq!(result.status_code, Some(404));
        assert!(result.body.is_none());
        assert!(result.error.is_none());
        assert_eq!(result.describe(), "status 404");
    }

    #[test]
    fn failed_result_has_no_status() {
        let result = CallResult::failed(Failure::timeout("no response within 10ms"));

        assert_eq!(result.status_code, None);
        assert_eq!(result.describe(), "TIMEOUT: no response within 10ms");
    }
}
