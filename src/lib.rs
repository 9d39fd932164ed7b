//! Black-box conformance and concurrency-stress harness for Petstore-style
//! REST APIs.
//!
//! Requests are described as immutable [`RequestSpec`]s, executed through an
//! [`Executor`] bound to any [`Remote`] (a live server via [`HttpRemote`] or
//! the [`InMemoryPetstore`] fake), and judged by [`Expectation`]s. Scenarios
//! group those calls into end-to-end cases with guaranteed cleanup.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod fake;
pub mod fixtures;
pub mod http;
pub mod logging;
pub mod runner;
pub mod scenario;
pub mod testing;

pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use fake::InMemoryPetstore;
pub use http::{CallResult, Executor, FailureKind, HttpRemote, Remote, RequestSpec};
pub use runner::{RunReport, run_suite};
pub use scenario::{Family, Scenario, ScenarioContext, catalog, select};
pub use testing::{Expectation, ScenarioVerdict, run_concurrent};
