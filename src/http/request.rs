use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use crate::environment::Variables;
use crate::error::{HarnessError, Result};

use super::method::HttpMethod;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Payload attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
    /// Serialized as JSON with an `application/json` content type.
    Json(Value),
    /// Sent verbatim with no implied content type.
    Raw(String),
    /// Url-encoded form fields.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// The content type the transport attaches when the caller sets none.
    pub fn implied_content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
            RequestBody::Raw(_) => None,
            RequestBody::Form(_) => Some(FORM_CONTENT_TYPE),
        }
    }
}

/// One fully-resolved request. Fields are private so a spec cannot change
/// after [`RequestSpecBuilder::build`]; clones are independent snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    method: HttpMethod,
    path: String,
    query: BTreeMap<String, String>,
    body: Option<RequestBody>,
    headers: BTreeMap<String, String>,
    #[serde(serialize_with = "serialize_millis")]
    timeout: Duration,
}

impl RequestSpec {
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder::new(method, path)
    }

    pub fn get(path: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> RequestSpecBuilder {
        Self::builder(HttpMethod::Delete, path)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The content type as the remote will see it: an explicit header wins,
    /// otherwise whatever the body kind implies.
    pub fn effective_content_type(&self) -> Option<&str> {
        self.header("content-type").or_else(|| {
            self.body
                .as_ref()
                .and_then(RequestBody::implied_content_type)
        })
    }

    /// `METHOD /path` for diagnostics.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Consuming builder for [`RequestSpec`]. Errors (a payload that does not
/// serialize, a bad header) surface from [`Self::build`].
#[derive(Debug)]
pub struct RequestSpecBuilder {
    method: HttpMethod,
    path: String,
    vars: Variables,
    query: BTreeMap<String, String>,
    body: Option<RequestBody>,
    encode_error: Option<serde_json::Error>,
    headers: BTreeMap<String, String>,
    timeout: Duration,
}

impl RequestSpecBuilder {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            vars: Variables::new(),
            query: BTreeMap::new(),
            body: None,
            encode_error: None,
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bind a `{{key}}` placeholder in the path.
    pub fn var(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.vars.set(key, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn json<T: Serialize>(mut self, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => self.with_body(RequestBody::Json(value)),
            Err(err) => {
                self.body = None;
                self.encode_error = Some(err);
                self
            }
        }
    }

    pub fn json_value(self, value: Value) -> Self {
        self.with_body(RequestBody::Json(value))
    }

    pub fn raw(self, body: impl Into<String>) -> Self {
        self.with_body(RequestBody::Raw(body.into()))
    }

    pub fn form<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.with_body(RequestBody::Form(fields))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self.encode_error = None;
        self
    }

    /// Resolve placeholders, validate headers, and freeze the spec.
    pub fn build(self) -> Result<RequestSpec> {
        if let Some(err) = self.encode_error {
            return Err(HarnessError::Serialize(err));
        }
        let path = self.vars.resolve(&self.path)?;
        if !path.starts_with('/') {
            return Err(HarnessError::InvalidPath(path));
        }

        for (key, value) in &self.headers {
            HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
                HarnessError::InvalidHeaderName {
                    key: key.clone(),
                    reason: err.to_string(),
                }
            })?;
            HeaderValue::from_str(value).map_err(|err| HarnessError::InvalidHeaderValue {
                key: key.clone(),
                reason: err.to_string(),
            })?;
        }

        let body = if self.method.carries_body() {
            self.body
        } else {
            None
        };

        Ok(RequestSpec {
            method: self.method,
            path,
            query: self.query,
            body,
            headers: self.headers,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_binds_path_placeholders() {
        let spec = RequestSpec::get("/pet/{{petId}}")
            .var("petId", 12345)
            .build()
            .expect("spec");

        assert_eq!(spec.path(), "/pet/12345");
        assert_eq!(spec.label(), "GET /pet/12345");
        assert_eq!(spec.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn build_rejects_relative_path_and_bad_headers() {
        assert!(matches!(
            RequestSpec::get("pet/1").build(),
            Err(HarnessError::InvalidPath(_))
        ));
        assert!(matches!(
            RequestSpec::get("/pet/1").header("bad header", "x").build(),
            Err(HarnessError::InvalidHeaderName { .. })
        ));
        assert!(matches!(
            RequestSpec::get("/pet/1").header("x-probe", "line\nbreak").build(),
            Err(HarnessError::InvalidHeaderValue { .. })
        ));
    }

    #[test]
    fn unserializable_payload_fails_build() {
        // JSON object keys must be strings.
        let payload: BTreeMap<(i32, i32), i32> = [((1, 2), 3)].into_iter().collect();

        let built = RequestSpec::post("/pet").json(&payload).build();

        assert!(matches!(built, Err(HarnessError::Serialize(_))));
    }

    #[test]
    fn replacing_a_bad_payload_clears_the_error() {
        let payload: BTreeMap<(i32, i32), i32> = [((1, 2), 3)].into_iter().collect();

        let spec = RequestSpec::post("/pet")
            .json(&payload)
            .json_value(json!({"id": 1}))
            .build()
            .expect("spec");

        assert_eq!(spec.body(), Some(&RequestBody::Json(json!({"id": 1}))));
    }

    #[test]
    fn get_requests_drop_their_body() {
        let spec = RequestSpec::get("/pet/findByStatus")
            .json_value(json!({"ignored": true}))
            .build()
            .expect("spec");
        assert!(spec.body().is_none());
    }

    #[test]
    fn effective_content_type_prefers_explicit_header() {
        let implied = RequestSpec::post("/pet")
            .json_value(json!({"id": 1}))
            .build()
            .expect("spec");
        assert_eq!(implied.effective_content_type(), Some(JSON_CONTENT_TYPE));

        let raw = RequestSpec::post("/pet").raw("{name: 'Buddy'}").build().expect("spec");
        assert_eq!(raw.effective_content_type(), None);

        let explicit = RequestSpec::post("/pet")
            .raw("{}")
            .header("Content-Type", "application/json")
            .build()
            .expect("spec");
        assert_eq!(explicit.effective_content_type(), Some("application/json"));
    }
}
