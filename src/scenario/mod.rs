//! # Scenarios
//!
//! A scenario is one end-to-end case: build fixtures, issue requests, check
//! each response before moving on. [`ScenarioRun`] carries the bookkeeping;
//! the per-family modules hold the catalog.

use std::fmt::{self, Display};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::config::HarnessConfig;
use crate::http::client::{Executor, Remote};
use crate::http::method::HttpMethod;
use crate::http::request::{RequestSpec, RequestSpecBuilder};
use crate::http::response::{CallResult, Failure};
use crate::testing::assertion::{Expectation, Verdict, check_all};
use crate::testing::harness::{batch_verdict, run_concurrent_same};
use crate::testing::verdict::ScenarioVerdict;

/// Resource family a scenario exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Pet,
    Store,
    User,
}

impl Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Family::Pet => "pet",
            Family::Store => "store",
            Family::User => "user",
        };
        f.write_str(label)
    }
}

/// A named entry in the catalog.
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub family: Family,
    pub run: fn(ScenarioContext) -> BoxFuture<'static, ScenarioVerdict>,
}

impl Scenario {
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.family, self.name)
    }

    pub async fn execute(&self, ctx: ScenarioContext) -> ScenarioVerdict {
        (self.run)(ctx).await
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("family", &self.family)
            .finish()
    }
}

macro_rules! scenario {
    ($family:expr, $name:literal, $run:path) => {
        $crate::scenario::Scenario {
            name: $name,
            family: $family,
            run: |ctx| Box::pin($run(ctx)),
        }
    };
}
pub(crate) use scenario;

pub mod pet;
pub mod store;
pub mod user;

/// Every scenario, pets first, then store, then users.
pub fn catalog() -> Vec<Scenario> {
    let mut scenarios = pet::scenarios();
    scenarios.extend(store::scenarios());
    scenarios.extend(user::scenarios());
    scenarios
}

/// Narrow the catalog by family (empty means all) and by a substring of the
/// qualified name.
pub fn select(families: &[Family], filter: Option<&str>) -> Vec<Scenario> {
    catalog()
        .into_iter()
        .filter(|scenario| families.is_empty() || families.contains(&scenario.family))
        .filter(|scenario| {
            filter.is_none_or(|needle| scenario.qualified_name().contains(needle))
        })
        .collect()
}

/// Shared handles every scenario receives: the executor bound to the remote
/// under test and the run configuration.
#[derive(Clone)]
pub struct ScenarioContext {
    executor: Executor,
    config: Arc<HarnessConfig>,
}

impl ScenarioContext {
    pub fn new(remote: Arc<dyn Remote>, config: HarnessConfig) -> Self {
        Self {
            executor: Executor::new(remote),
            config: Arc::new(config),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// A request builder carrying the run-wide timeout.
    pub fn request(&self, method: HttpMethod, path: &str) -> RequestSpecBuilder {
        RequestSpec::builder(method, path).timeout(self.config.timeout())
    }

    pub fn get(&self, path: &str) -> RequestSpecBuilder {
        self.request(HttpMethod::Get, path)
    }

    pub fn post(&self, path: &str) -> RequestSpecBuilder {
        self.request(HttpMethod::Post, path)
    }

    pub fn put(&self, path: &str) -> RequestSpecBuilder {
        self.request(HttpMethod::Put, path)
    }

    pub fn delete(&self, path: &str) -> RequestSpecBuilder {
        self.request(HttpMethod::Delete, path)
    }

    pub fn begin(&self, name: &str) -> ScenarioRun {
        ScenarioRun {
            ctx: self.clone(),
            name: name.to_string(),
            steps: 0,
            verdict: ScenarioVerdict::passing(),
            cleanups: Vec::new(),
        }
    }
}

/// Step-by-step execution of one scenario.
///
/// After the first failed step every later step is skipped. Cleanup
/// requests registered with [`ScenarioRun::defer_cleanup`] run on every exit
/// path: from [`ScenarioRun::finish`], or in the background if the run is
/// dropped without finishing. Cleanup outcomes are logged and never recorded
/// as failures.
pub struct ScenarioRun {
    ctx: ScenarioContext,
    name: String,
    steps: usize,
    verdict: ScenarioVerdict,
    cleanups: Vec<(String, RequestSpec)>,
}

impl ScenarioRun {
    pub fn ctx(&self) -> &ScenarioContext {
        &self.ctx
    }

    pub fn failed(&self) -> bool {
        !self.verdict.passed
    }

    /// Execute one request and check it. Returns the result only when every
    /// expectation held.
    pub async fn step(
        &mut self,
        label: &str,
        request: RequestSpecBuilder,
        expectations: &[Expectation],
    ) -> Option<CallResult> {
        let (index, spec) = self.prepare(label, request)?;
        let result = self.ctx.executor.execute(&spec).await;
        let verdict = check_all(&result, expectations);
        self.settle(index, label, &verdict).then_some(result)
    }

    /// Execute a request without checking it, for setup calls whose outcome
    /// does not matter. Skipped like any other step after a failure.
    pub async fn send(&mut self, label: &str, request: RequestSpecBuilder) -> Option<CallResult> {
        let (_, spec) = self.prepare(label, request)?;
        let result = self.ctx.executor.execute(&spec).await;
        tracing::debug!(
            scenario = %self.name,
            step = label,
            outcome = %result.describe(),
            "unchecked step"
        );
        Some(result)
    }

    /// A read that confirms an earlier write. Retried up to
    /// `confirm_retries` extra times, `confirm_delay_ms` apart, before the
    /// last verdict is recorded.
    pub async fn confirm(
        &mut self,
        label: &str,
        request: RequestSpecBuilder,
        expectations: &[Expectation],
    ) -> Option<CallResult> {
        let (index, spec) = self.prepare(label, request)?;
        let retries = self.ctx.config.confirm_retries;
        let mut attempt = 0;
        loop {
            let result = self.ctx.executor.execute(&spec).await;
            let verdict = check_all(&result, expectations);
            if verdict.passed || attempt >= retries {
                return self.settle(index, label, &verdict).then_some(result);
            }

            attempt += 1;
            tracing::debug!(
                scenario = %self.name,
                step = label,
                attempt,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "confirmation read not yet consistent, retrying"
            );
            tokio::time::sleep(self.ctx.config.confirm_delay()).await;
        }
    }

    /// Dispatch the same request `count` times across `max_workers` and
    /// check every dispatch. Failures are recorded under their dispatch
    /// index.
    pub async fn burst(
        &mut self,
        label: &str,
        request: RequestSpecBuilder,
        count: usize,
        max_workers: usize,
        expectation: &Expectation,
    ) -> Option<Vec<CallResult>> {
        let (_, spec) = self.prepare(label, request)?;
        let results = run_concurrent_same(&self.ctx.executor, spec, count, max_workers).await;
        let verdict = batch_verdict(label, &results, expectation);

        tracing::debug!(
            scenario = %self.name,
            step = label,
            count,
            max_workers,
            failed = verdict.failures.len(),
            "burst checked"
        );

        let passed = verdict.passed;
        self.verdict.absorb(verdict);
        passed.then_some(results)
    }

    /// Register a release request (usually a delete) for a resource this
    /// scenario acquired.
    pub fn defer_cleanup(&mut self, label: &str, request: RequestSpecBuilder) {
        match request.build() {
            Ok(spec) => self.cleanups.push((label.to_string(), spec)),
            Err(err) => tracing::warn!(
                scenario = %self.name,
                step = label,
                error = %err,
                "cleanup request is invalid and will not run"
            ),
        }
    }

    /// Run pending cleanups (most recent first) and return the verdict.
    pub async fn finish(mut self) -> ScenarioVerdict {
        let cleanups = std::mem::take(&mut self.cleanups);
        for (label, spec) in cleanups.into_iter().rev() {
            let result = self.ctx.executor.execute(&spec).await;
            tracing::debug!(
                scenario = %self.name,
                step = %label,
                outcome = %result.describe(),
                "cleanup finished"
            );
        }
        std::mem::take(&mut self.verdict)
    }

    /// Allocate a step number and freeze the request, or `None` if the
    /// scenario already failed or the request is invalid.
    fn prepare(&mut self, label: &str, request: RequestSpecBuilder) -> Option<(usize, RequestSpec)> {
        if self.failed() {
            tracing::debug!(scenario = %self.name, step = label, "skipped after earlier failure");
            return None;
        }

        let index = self.steps;
        self.steps += 1;
        match request.build() {
            Ok(spec) => Some((index, spec)),
            Err(err) => {
                let failure = Failure::unhandled(format!("invalid request: {err}"));
                let verdict = Verdict::fail(failure.kind, failure.message);
                self.settle(index, label, &verdict);
                None
            }
        }
    }

    fn settle(&mut self, index: usize, label: &str, verdict: &Verdict) -> bool {
        if !verdict.passed {
            tracing::info!(
                scenario = %self.name,
                step = label,
                index,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "step failed"
            );
        }
        self.verdict.record(index, label, verdict);
        verdict.passed
    }
}

impl Drop for ScenarioRun {
    fn drop(&mut self) {
        if self.cleanups.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                scenario = %self.name,
                pending = self.cleanups.len(),
                "scenario dropped outside a runtime; cleanup skipped"
            );
            return;
        };

        let executor = self.ctx.executor.clone();
        let cleanups = std::mem::take(&mut self.cleanups);
        runtime.spawn(async move {
            for (_, spec) in cleanups.into_iter().rev() {
                executor.execute(&spec).await;
            }
        });
    }
}
