use std::fmt::Write as _;
use std::time::Instant;

use serde::Serialize;

use crate::error::Result;
use crate::scenario::{Family, Scenario, ScenarioContext};
use crate::testing::verdict::StepFailure;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub name: String,
    pub family: Family,
    pub passed: bool,
    pub duration_ms: u64,
    pub failures: Vec<StepFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub target: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Scenarios never started because of `--fail-fast`.
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioOutcome>,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "target: {}", self.target);
        for outcome in &self.results {
            let mark = if outcome.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(
                out,
                "{mark} {}/{} ({} ms)",
                outcome.family, outcome.name, outcome.duration_ms
            );
            for failure in &outcome.failures {
                let _ = writeln!(
                    out,
                    "    [{}] {} #{}: {}",
                    failure.kind, failure.step, failure.index, failure.reason
                );
            }
        }
        let _ = write!(
            out,
            "{} scenarios: {} passed, {} failed",
            self.total, self.passed, self.failed
        );
        if self.skipped > 0 {
            let _ = write!(out, ", {} skipped", self.skipped);
        }
        let _ = writeln!(out, " in {} ms", self.duration_ms);
        out
    }
}

/// Run `scenarios` one after another. Each scenario owns its fixtures, so
/// ordering only matters for readability of the report.
pub async fn run_suite(ctx: &ScenarioContext, scenarios: &[Scenario]) -> RunReport {
    let started = Instant::now();
    let fail_fast = ctx.config().fail_fast;
    let mut results = Vec::with_capacity(scenarios.len());

    for scenario in scenarios {
        let scenario_started = Instant::now();
        let verdict = scenario.execute(ctx.clone()).await;
        let duration_ms = scenario_started.elapsed().as_millis() as u64;

        tracing::info!(
            scenario = %scenario.qualified_name(),
            passed = verdict.passed,
            failures = verdict.failures.len(),
            duration_ms,
            "scenario finished"
        );

        let passed = verdict.passed;
        results.push(ScenarioOutcome {
            name: scenario.name.to_string(),
            family: scenario.family,
            passed,
            duration_ms,
            failures: verdict.failures,
        });

        if fail_fast && !passed {
            break;
        }
    }

    let passed = results.iter().filter(|outcome| outcome.passed).count();
    let failed = results.len() - passed;
    RunReport {
        target: ctx.executor().remote().describe(),
        total: scenarios.len(),
        passed,
        failed,
        skipped: scenarios.len() - results.len(),
        duration_ms: started.elapsed().as_millis() as u64,
        results,
    }
}
