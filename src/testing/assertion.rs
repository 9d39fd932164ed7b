use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::Serialize;
use serde_json::Value;

use crate::http::response::{CallResult, FailureKind, lookup};

pub const BODY_NOT_PARSEABLE: &str = "body not parseable";

/// A pure predicate over a [`CallResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    Status(u16),
    StatusIn(BTreeSet<u16>),
    StatusNot(u16),
    FieldEquals { path: String, value: Value },
    FieldPresent(String),
    FieldAbsent(String),
    /// The body is a JSON array and every element has `path == value`.
    EachFieldEquals { path: String, value: Value },
}

impl Expectation {
    pub fn status(code: u16) -> Self {
        Expectation::Status(code)
    }

    pub fn status_in(codes: impl IntoIterator<Item = u16>) -> Self {
        Expectation::StatusIn(codes.into_iter().collect())
    }

    pub fn status_not(code: u16) -> Self {
        Expectation::StatusNot(code)
    }

    pub fn field_eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Expectation::FieldEquals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn field_present(path: impl Into<String>) -> Self {
        Expectation::FieldPresent(path.into())
    }

    pub fn field_absent(path: impl Into<String>) -> Self {
        Expectation::FieldAbsent(path.into())
    }

    pub fn each_field_eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Expectation::EachFieldEquals {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Status(code) => write!(f, "status == {code}"),
            Expectation::StatusIn(codes) => {
                let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
                write!(f, "status in {{{}}}", codes.join(", "))
            }
            Expectation::StatusNot(code) => write!(f, "status != {code}"),
            Expectation::FieldEquals { path, value } => write!(f, "body.{path} == {value}"),
            Expectation::FieldPresent(path) => write!(f, "body.{path} present"),
            Expectation::FieldAbsent(path) => write!(f, "body.{path} absent"),
            Expectation::EachFieldEquals { path, value } => {
                write!(f, "every body[*].{path} == {value}")
            }
        }
    }
}

/// Outcome of one check. `kind` says why a failed check failed: a
/// `ContractViolation` when a response arrived, otherwise the call's own
/// failure class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            kind: None,
            reason: None,
        }
    }

    pub fn fail(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            kind: Some(kind),
            reason: Some(reason.into()),
        }
    }
}

/// Evaluate `expectation` against `result`. Pure and thread-safe.
pub fn check(result: &CallResult, expectation: &Expectation) -> Verdict {
    match expectation {
        Expectation::Status(code) => status_verdict(result, expectation, |status| status == *code),
        Expectation::StatusIn(codes) => {
            status_verdict(result, expectation, |status| codes.contains(&status))
        }
        Expectation::StatusNot(code) => {
            status_verdict(result, expectation, |status| status != *code)
        }
        Expectation::FieldEquals { path, value } => match json_object(result, expectation) {
            Err(verdict) => verdict,
            Ok(body) => match lookup(body, path) {
                Some(actual) if actual == value => Verdict::pass(),
                Some(actual) => violation(expectation, format!("found {actual}")),
                None => violation(expectation, "field missing"),
            },
        },
        Expectation::FieldPresent(path) => match json_object(result, expectation) {
            Err(verdict) => verdict,
            Ok(body) if lookup(body, path).is_some() => Verdict::pass(),
            Ok(_) => violation(expectation, "field missing"),
        },
        Expectation::FieldAbsent(path) => match json_object(result, expectation) {
            Err(verdict) => verdict,
            Ok(body) => match lookup(body, path) {
                None => Verdict::pass(),
                Some(actual) => violation(expectation, format!("found {actual}")),
            },
        },
        Expectation::EachFieldEquals { path, value } => {
            let Some(body) = result.json() else {
                return Verdict::fail(body_failure_kind(result), BODY_NOT_PARSEABLE);
            };
            let Some(items) = body.as_array() else {
                return violation(expectation, "body is not a JSON array");
            };
            for (position, item) in items.iter().enumerate() {
                match lookup(item, path) {
                    Some(actual) if actual == value => {}
                    Some(actual) => {
                        return violation(expectation, format!("element {position} has {actual}"));
                    }
                    None => {
                        return violation(
                            expectation,
                            format!("element {position} lacks the field"),
                        );
                    }
                }
            }
            Verdict::pass()
        }
    }
}

/// Check every expectation in order, stopping at the first failure.
pub fn check_all(result: &CallResult, expectations: &[Expectation]) -> Verdict {
    expectations
        .iter()
        .map(|expectation| check(result, expectation))
        .find(|verdict| !verdict.passed)
        .unwrap_or_else(Verdict::pass)
}

/// A missing body is the call's own failure when it has one (timeout,
/// transport, malformed JSON), otherwise the response broke the contract.
fn body_failure_kind(result: &CallResult) -> FailureKind {
    result
        .failure_kind()
        .unwrap_or(FailureKind::ContractViolation)
}

fn status_verdict(
    result: &CallResult,
    expectation: &Expectation,
    predicate: impl FnOnce(u16) -> bool,
) -> Verdict {
    let Some(status) = result.status_code else {
        let kind = result
            .failure_kind()
            .unwrap_or(FailureKind::UnhandledFailure);
        return Verdict::fail(
            kind,
            format!("expected {expectation}, got {}", result.describe()),
        );
    };

    if predicate(status) {
        Verdict::pass()
    } else {
        Verdict::fail(
            FailureKind::ContractViolation,
            format!("expected {expectation}, got status {status}"),
        )
    }
}

/// The body as a JSON object, or the verdict explaining why it is not one.
fn json_object<'a>(
    result: &'a CallResult,
    expectation: &Expectation,
) -> Result<&'a Value, Verdict> {
    let Some(body) = result.json() else {
        return Err(Verdict::fail(body_failure_kind(result), BODY_NOT_PARSEABLE));
    };
    if !body.is_object() {
        return Err(violation(expectation, "body is not a JSON object"));
    }
    Ok(body)
}

fn violation(expectation: &Expectation, detail: impl Display) -> Verdict {
    Verdict::fail(
        FailureKind::ContractViolation,
        format!("expected {expectation}, {detail}"),
    )
}
