//! # Testing & Assertions
//!
//! Assertion evaluation for single responses and the bounded-concurrency
//! harness that fans a request out across a worker pool.
//!
//! - [`assertion`]: status / status-set / JSON field expectations
//! - [`harness`]: index-preserving concurrent dispatch
//! - [`verdict`]: per-scenario aggregation of failed checks

pub mod assertion;
pub mod harness;
pub mod verdict;

pub use assertion::{Expectation, Verdict, check, check_all};
pub use harness::{batch_verdict, run_concurrent, run_concurrent_same};
pub use verdict::{ScenarioVerdict, StepFailure};
