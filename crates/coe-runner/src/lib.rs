//! Issues adapter calls concurrently, bounded by a semaphore, then sorts
//! results deterministically before handing them to the opinion engine.
//! Cancellation is threaded through every task.

use coe_adapters::{Check, Evidence, Namespace};
use coe_error::CoeError;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;

/// A cooperative cancellation signal, threaded through every in-flight
/// adapter call. Implemented locally rather than pulling in `tokio-util`,
/// since nothing else in the stack needs that crate.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called, including if it already was.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.notify.notified().await;
        }
    }
}

type CheckResult = Result<(Check, Evidence), CoeError>;
type CheckFuture = Pin<Box<dyn Future<Output = CheckResult> + Send>>;

/// One adapter invocation queued for the runner. `query_key` is the
/// canonical query string used for the post-hoc deterministic sort. A task
/// fails only when something beyond the adapter call itself goes wrong
/// (e.g. a cache write) — the adapter call itself never fails, it degrades
/// to an `unknown` check instead.
pub struct CheckTask {
    pub namespace: Namespace,
    pub query_key: String,
    pub future: CheckFuture,
}

/// Runs `tasks` concurrently, bounded by `concurrency_limit`, and returns
/// their `(Check, Evidence)` results sorted by `(namespace, query_key)`.
/// Tasks still in flight when `cancellation` fires are dropped without a
/// result — any partial cache write the caller was about to perform for
/// that task must be skipped. The first task error encountered (e.g. a
/// cache-write I/O failure) cancels the remaining tasks and is returned to
/// the caller rather than silently dropped.
pub async fn run_batch(
    tasks: Vec<CheckTask>,
    concurrency_limit: usize,
    cancellation: CancellationToken,
) -> Result<Vec<(Check, Evidence)>, CoeError> {
    let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let mut join_set = JoinSet::new();

    for task in tasks {
        let semaphore = semaphore.clone();
        let cancellation = cancellation.clone();
        join_set.spawn(async move {
            let Ok(permit) = semaphore.acquire_owned().await else {
                return None;
            };
            let namespace = task.namespace;
            let query_key = task.query_key;
            let outcome = tokio::select! {
                biased;
                () = cancellation.cancelled() => None,
                result = task.future => Some(result),
            };
            drop(permit);
            outcome.map(|result| (namespace, query_key, result))
        });
    }

    let mut results = Vec::new();
    let mut first_error = None;
    while let Some(joined) = join_set.join_next().await {
        if let Ok(Some((namespace, query_key, result))) = joined {
            match result {
                Ok((check, evidence)) => results.push((namespace, query_key, check, evidence)),
                Err(err) => {
                    cancellation.cancel();
                    first_error.get_or_insert(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    results.sort_by(|a, b| (a.0.to_string(), &a.1).cmp(&(b.0.to_string(), &b.1)));
    Ok(results.into_iter().map(|(_, _, check, evidence)| (check, evidence)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coe_adapters::{Authority, EvidenceSource, Status};
    use serde_json::json;
    use std::time::Duration;

    fn dummy(namespace: Namespace, query_key: &str, delay_ms: u64) -> CheckTask {
        let query_key = query_key.to_string();
        let ns = namespace;
        CheckTask {
            namespace,
            query_key: query_key.clone(),
            future: Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let check = Check {
                    id: format!("chk.{ns}.{query_key}"),
                    namespace: ns,
                    query: json!({}),
                    status: Status::Available,
                    authority: Authority::Authoritative,
                    claimability: None,
                    observed_at: "2026-01-01T00:00:00Z".into(),
                    evidence_ref: "ev.x.0".into(),
                    errors: Vec::new(),
                };
                let evidence = Evidence {
                    id: "ev.x.0".into(),
                    kind: "http_response".into(),
                    source: EvidenceSource {
                        system: ns.to_string(),
                        url: "https://example.test".into(),
                        method: "GET".into(),
                    },
                    observed_at: "2026-01-01T00:00:00Z".into(),
                    sha256: Some("0".repeat(64)),
                    bytes: Some(0),
                    repro: vec!["curl -s https://example.test".into()],
                    notes: None,
                };
                Ok((check, evidence))
            }),
        }
    }

    fn failing(namespace: Namespace, query_key: &str) -> CheckTask {
        CheckTask {
            namespace,
            query_key: query_key.to_string(),
            future: Box::pin(async move {
                Err(CoeError::CacheIo {
                    path: "/tmp/whatever".into(),
                    source: std::io::Error::other("disk full"),
                })
            }),
        }
    }

    #[tokio::test]
    async fn results_are_sorted_regardless_of_completion_order() {
        let tasks = vec![
            dummy(Namespace::Npm, "z", 10),
            dummy(Namespace::GithubOrg, "a", 0),
        ];
        let results = run_batch(tasks, 4, CancellationToken::new()).await.unwrap();
        assert_eq!(results[0].0.namespace, Namespace::GithubOrg);
        assert_eq!(results[1].0.namespace, Namespace::Npm);
    }

    #[tokio::test]
    async fn cancellation_before_start_drops_the_task() {
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let tasks = vec![dummy(Namespace::Npm, "a", 50)];
        let results = run_batch(tasks, 4, cancellation).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn concurrency_limit_is_honored() {
        let tasks = (0..5).map(|i| dummy(Namespace::Npm, &i.to_string(), 5)).collect();
        let results = run_batch(tasks, 2, CancellationToken::new()).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn a_task_error_propagates_instead_of_being_dropped() {
        let tasks = vec![dummy(Namespace::Npm, "a", 0), failing(Namespace::Pypi, "b")];
        let err = run_batch(tasks, 4, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoeError::CacheIo { .. }));
    }
}
