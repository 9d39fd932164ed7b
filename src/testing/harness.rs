use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::mpsc;

use crate::http::client::Executor;
use crate::http::request::RequestSpec;
use crate::http::response::{CallResult, Failure};

use super::assertion::{Expectation, check};
use super::verdict::ScenarioVerdict;

/// Dispatch `count` executions across at most `max_workers` concurrent
/// workers and return one result per dispatch, in submission order.
///
/// `spec_factory` receives the dispatch index. A dispatch that panics (in the
/// factory or below the executor) yields an `UnhandledFailure` result; every
/// other dispatch still runs to completion.
pub async fn run_concurrent<F>(
    executor: &Executor,
    spec_factory: F,
    count: usize,
    max_workers: usize,
) -> Vec<CallResult>
where
    F: Fn(usize) -> RequestSpec + Send + Sync + 'static,
{
    if count == 0 {
        return Vec::new();
    }

    let worker_count = max_workers.clamp(1, count);
    let started = Instant::now();
    let factory = Arc::new(spec_factory);
    let next_index = Arc::new(AtomicUsize::new(0));
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, CallResult)>();

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let executor = executor.clone();
        let factory = factory.clone();
        let next_index = next_index.clone();
        let result_tx = result_tx.clone();

        let handle = tokio::spawn(async move {
            loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                if index >= count {
                    break;
                }

                let result = dispatch(&executor, factory.as_ref(), index).await;
                if result_tx.send((index, result)).is_err() {
                    break;
                }
            }
        });
        handles.push(handle);
    }
    drop(result_tx);

    // Each dispatch owns exactly one slot; completion order is irrelevant.
    let mut slots: Vec<Option<CallResult>> = (0..count).map(|_| None).collect();
    while let Some((index, result)) = result_rx.recv().await {
        slots[index] = Some(result);
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "harness worker terminated abnormally");
        }
    }

    tracing::debug!(
        count,
        workers = worker_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "concurrent batch finished"
    );

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                CallResult::failed(Failure::unhandled(format!(
                    "dispatch {index} produced no result"
                )))
            })
        })
        .collect()
}

/// [`run_concurrent`] with one fixed spec shared by every dispatch.
pub async fn run_concurrent_same(
    executor: &Executor,
    spec: RequestSpec,
    count: usize,
    max_workers: usize,
) -> Vec<CallResult> {
    let spec = Arc::new(spec);
    run_concurrent(executor, move |_| spec.as_ref().clone(), count, max_workers).await
}

/// Check every result of a batch against `expectation`, keyed by dispatch
/// index.
pub fn batch_verdict(
    step: &str,
    results: &[CallResult],
    expectation: &Expectation,
) -> ScenarioVerdict {
    let mut verdict = ScenarioVerdict::passing();
    for (index, result) in results.iter().enumerate() {
        verdict.record(index, step, &check(result, expectation));
    }
    verdict
}

async fn dispatch<F>(executor: &Executor, factory: &F, index: usize) -> CallResult
where
    F: Fn(usize) -> RequestSpec,
{
    let attempt = AssertUnwindSafe(async {
        let spec = factory(index);
        executor.execute(&spec).await
    })
    .catch_unwind()
    .await;

    match attempt {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(index, message = %message, "dispatch panicked");
            CallResult::failed(Failure::unhandled(format!(
                "dispatch {index} panicked: {message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::Remote;
    use crate::http::response::{FailureKind, RawResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Echoes the requested path back and tracks peak concurrency.
    #[derive(Default)]
    struct EchoRemote {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Remote for EchoRemote {
        async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, Failure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if spec.path().ends_with("/fail") {
                return Ok(RawResponse::json(500, &json!({"path": spec.path()})));
            }
            Ok(RawResponse::json(200, &json!({"path": spec.path()})))
        }

        fn describe(&self) -> String {
            "echo".to_string()
        }
    }

    fn indexed_spec(index: usize) -> RequestSpec {
        let path = if index % 4 == 3 {
            format!("/item/{index}/fail")
        } else {
            format!("/item/{index}")
        };
        RequestSpec::get(path).build().expect("spec")
    }

    #[tokio::test]
    async fn zero_count_returns_empty() {
        let executor = Executor::new(Arc::new(EchoRemote::default()));
        let results = run_concurrent(&executor, indexed_spec, 0, 4).await;
        assert!(results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn results_keep_submission_order() {
        let executor = Executor::new(Arc::new(EchoRemote::default()));
        let results = run_concurrent(&executor, indexed_spec, 12, 5).await;

        assert_eq!(results.len(), 12);
        for (index, result) in results.iter().enumerate() {
            let path = result.field("path").and_then(|value| value.as_str());
            assert!(
                path.is_some_and(|path| path.starts_with(&format!("/item/{index}"))),
                "slot {index} holds {path:?}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failures_are_invariant_to_pool_size() {
        let count = 8;
        let mut observed = Vec::new();
        for workers in [1, count, count * 2] {
            let executor = Executor::new(Arc::new(EchoRemote::default()));
            let results = run_concurrent(&executor, indexed_spec, count, workers).await;
            assert_eq!(results.len(), count);

            let verdict = batch_verdict("burst", &results, &Expectation::status(200));
            observed.push(verdict.failed_indices());
        }

        assert_eq!(observed[0], vec![3, 7]);
        assert!(observed.iter().all(|indices| indices == &observed[0]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_size_bounds_in_flight_requests() {
        let remote = Arc::new(EchoRemote::default());
        let executor = Executor::new(remote.clone());

        let results = run_concurrent(&executor, indexed_spec, 20, 3).await;

        assert_eq!(results.len(), 20);
        assert!(remote.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn panicking_dispatch_becomes_unhandled_failure() {
        let executor = Executor::new(Arc::new(EchoRemote::default()));
        let results = run_concurrent(
            &executor,
            |index| {
                if index == 2 {
                    panic!("fixture exploded");
                }
                RequestSpec::get(format!("/item/{index}")).build().expect("spec")
            },
            5,
            2,
        )
        .await;

        assert_eq!(results.len(), 5);
        let failure = results[2].error.as_ref().expect("failure");
        assert_eq!(failure.kind, FailureKind::UnhandledFailure);
        assert!(failure.message.contains("fixture exploded"));
        for index in [0, 1, 3, 4] {
            assert_eq!(results[index].status_code, Some(200));
        }
    }

    #[tokio::test]
    async fn same_spec_is_dispatched_count_times() {
        let executor = Executor::new(Arc::new(EchoRemote::default()));
        let spec = RequestSpec::get("/item/shared").build().expect("spec");

        let results = run_concurrent_same(&executor, spec, 6, 6).await;

        assert_eq!(results.len(), 6);
        assert!(batch_verdict("burst", &results, &Expectation::status(200)).passed);
    }
}
