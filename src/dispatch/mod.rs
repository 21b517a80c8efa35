//! Task dispatcher: a bounded queue drained by one worker per candidate
//! IP.
//!
//! A task is one logical fetch of the target resource. Workers race for
//! tasks; the first 200 claims a task for good, anything else sends it
//! back to the queue for a different IP until every candidate has had a
//! try. Status codes feed the reputation map as a side effect.

mod types;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{Client, ClientConfig, Method, RequestOptions, Response};
use crate::config::{DEFAULT_TASK_TIMEOUT, QUEUE_POLL_INTERVAL, REQUEUE_YIELD};
use crate::error_handling::EngineError;
use crate::fingerprint::FingerprintProfile;
use crate::pool::PoolStore;
use crate::reputation::ReputationMap;
use crate::utils::direct_url;

pub use types::{DispatchReport, GeoLatency, TaskOutcome};

/// One unit of work: fetch the target resource once, from any IP.
struct Task {
    id: usize,
    attempts: u32,
    last_tried_ip: Option<String>,
}

/// What to fetch and how hard to try.
#[derive(Debug, Clone)]
pub struct DispatchSpec {
    /// Logical hostname; SNI, Host header and reputation all key off it.
    pub host: String,
    /// Resource path requested from every candidate IP.
    pub path: String,
    /// Request headers shared by all workers.
    pub headers: HashMap<String, String>,
    /// Number of tasks to run.
    pub task_count: usize,
    /// Per-request deadline for each worker's client.
    pub timeout: Duration,
    /// Issue one throwaway request per worker before the measured loop so
    /// timings reflect established TLS/HTTP/2 sessions.
    pub prewarm: bool,
}

impl DispatchSpec {
    /// A spec with default timeout, no extra headers and no pre-warm.
    pub fn new(host: impl Into<String>, path: impl Into<String>, task_count: usize) -> Self {
        DispatchSpec {
            host: host.into(),
            path: path.into(),
            headers: HashMap::new(),
            task_count,
            timeout: DEFAULT_TASK_TIMEOUT,
            prewarm: false,
        }
    }
}

/// Shared state of one dispatch run.
struct RunState {
    host: String,
    worker_count: usize,
    remaining: AtomicUsize,
    results: Mutex<Vec<Option<TaskOutcome>>>,
    reputation: Arc<ReputationMap>,
}

impl RunState {
    /// Records `outcome` unless another worker already claimed the task.
    /// First claimant wins; exactly one outcome is recorded per task id.
    fn try_claim(&self, outcome: TaskOutcome) -> bool {
        let mut slots = self.results.lock().expect("result slots poisoned");
        let slot = &mut slots[outcome.task_id];
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.remaining.fetch_sub(1, Ordering::SeqCst);
        true
    }
}

/// Drives tasks against candidate IPs, reporting outcomes to `reputation`.
pub struct Dispatcher {
    store: Arc<PoolStore>,
    reputation: Arc<ReputationMap>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given store and reputation map.
    pub fn new(store: Arc<PoolStore>, reputation: Arc<ReputationMap>) -> Self {
        Dispatcher { store, reputation }
    }

    /// Runs `spec` with `profile`'s handshake and User-Agent, using every
    /// currently allowed IP of the host as a worker.
    pub async fn run(&self, profile: &FingerprintProfile, spec: DispatchSpec) -> DispatchReport {
        self.run_with_stop(profile, spec, CancellationToken::new())
            .await
    }

    /// Like [`Dispatcher::run`], cancellable through `stop`. Workers
    /// observe cancellation within the queue poll interval.
    pub async fn run_with_stop(
        &self,
        profile: &FingerprintProfile,
        spec: DispatchSpec,
        stop: CancellationToken,
    ) -> DispatchReport {
        let candidates = match self.store.ip_pool(&spec.host) {
            Ok(pool) => {
                let mut all = pool.ipv4;
                all.extend(pool.ipv6);
                self.reputation.filter(&spec.host, all)
            }
            Err(_) => Vec::new(),
        };

        let geo: HashMap<String, (String, String)> = candidates
            .iter()
            .filter_map(|ip| {
                self.store
                    .ip_detail(&spec.host, ip)
                    .ok()
                    .map(|record| (ip.clone(), (record.country, record.city)))
            })
            .collect();

        let mut headers = spec.headers.clone();
        headers
            .entry("User-Agent".to_string())
            .or_insert_with(|| profile.user_agent.to_string());

        let clients: Arc<HashMap<String, Arc<Client>>> = Arc::new(
            candidates
                .iter()
                .map(|ip| {
                    let config = ClientConfig {
                        timeout: spec.timeout,
                        server_name: Some(spec.host.clone()),
                        ..ClientConfig::default()
                    };
                    (ip.clone(), Arc::new(Client::new(profile.hello, config)))
                })
                .collect(),
        );

        info!(
            "dispatching {} tasks for {} across {} workers",
            spec.task_count,
            spec.host,
            candidates.len()
        );

        let host = spec.host.clone();
        let path = spec.path.clone();
        let fetch = move |ip: String| {
            let clients = Arc::clone(&clients);
            let host = host.clone();
            let path = path.clone();
            let headers = headers.clone();
            async move {
                let client = clients
                    .get(&ip)
                    .cloned()
                    .ok_or_else(|| EngineError::InvalidUrl(ip.clone()))?;
                let url = direct_url(&ip, &path);
                client
                    .execute(
                        Method::GET,
                        &url,
                        &RequestOptions {
                            headers,
                            host: Some(host),
                            body: None,
                        },
                    )
                    .await
            }
        };

        run_tasks(
            &spec.host,
            candidates,
            spec.task_count,
            spec.prewarm,
            Arc::clone(&self.reputation),
            geo,
            stop,
            fetch,
        )
        .await
    }
}

/// The worker kernel, generic over the fetch future so the scheduling
/// policy is testable without sockets.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_tasks<F, Fut>(
    host: &str,
    candidates: Vec<String>,
    task_count: usize,
    prewarm: bool,
    reputation: Arc<ReputationMap>,
    geo: HashMap<String, (String, String)>,
    stop: CancellationToken,
    fetch: F,
) -> DispatchReport
where
    F: Fn(String) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<Response, EngineError>> + Send + 'static,
{
    let started = Instant::now();

    if task_count == 0 {
        return DispatchReport::default();
    }

    if candidates.is_empty() {
        // No worker to run anything: every task fails immediately.
        let outcomes: Vec<TaskOutcome> = (0..task_count)
            .map(|id| TaskOutcome {
                task_id: id,
                ip: String::new(),
                status: None,
                success: false,
                error: Some("no candidate addresses".to_string()),
                duration: Duration::ZERO,
                attempts: 0,
                country: String::new(),
                city: String::new(),
            })
            .collect();
        return DispatchReport {
            succeeded: 0,
            failed: outcomes.len(),
            outcomes,
            elapsed: started.elapsed(),
        };
    }

    let worker_count = candidates.len();
    let (tx, rx) = mpsc::channel::<Task>(task_count);
    for id in 0..task_count {
        // Capacity equals the task count, so seeding cannot block.
        let _ = tx
            .send(Task {
                id,
                attempts: 0,
                last_tried_ip: None,
            })
            .await;
    }
    let rx = Arc::new(tokio::sync::Mutex::new(rx));

    let state = Arc::new(RunState {
        host: host.to_string(),
        worker_count,
        remaining: AtomicUsize::new(task_count),
        results: Mutex::new((0..task_count).map(|_| None).collect()),
        reputation,
    });

    let mut handles = Vec::with_capacity(worker_count);
    for ip in candidates {
        let (country, city) = geo.get(&ip).cloned().unwrap_or_default();
        let state = Arc::clone(&state);
        let rx = Arc::clone(&rx);
        let tx = tx.clone();
        let stop = stop.child_token();
        let fetch = fetch.clone();

        handles.push(tokio::spawn(async move {
            if prewarm {
                let _ = fetch(ip.clone()).await;
            }

            loop {
                if state.remaining.load(Ordering::SeqCst) == 0 {
                    return;
                }

                let mut task = {
                    let mut queue = rx.lock().await;
                    tokio::select! {
                        biased;
                        _ = stop.cancelled() => return,
                        polled = tokio::time::timeout(QUEUE_POLL_INTERVAL, queue.recv()) => {
                            match polled {
                                Ok(Some(task)) => task,
                                Ok(None) => return,
                                Err(_) => continue,
                            }
                        }
                    }
                };

                if state.remaining.load(Ordering::SeqCst) == 0 {
                    let _ = tx.send(task).await;
                    return;
                }

                // Anti-immediate-retry: this worker just failed the task,
                // give it to somebody else.
                if task.last_tried_ip.as_deref() == Some(ip.as_str()) {
                    let _ = tx.send(task).await;
                    tokio::time::sleep(REQUEUE_YIELD).await;
                    continue;
                }

                let attempt_started = Instant::now();
                let result = fetch(ip.clone()).await;
                let duration = attempt_started.elapsed();

                match result {
                    Ok(resp) if resp.status_code == 200 => {
                        state.reputation.report(&state.host, &ip, 200);
                        let claimed = state.try_claim(TaskOutcome {
                            task_id: task.id,
                            ip: ip.clone(),
                            status: Some(200),
                            success: true,
                            error: None,
                            duration,
                            attempts: task.attempts + 1,
                            country: country.clone(),
                            city: city.clone(),
                        });
                        if claimed {
                            debug!(
                                "task {} done via {ip} in {duration:?}",
                                task.id
                            );
                        }
                    }
                    other => {
                        let (status, error) = match &other {
                            Ok(resp) => (
                                Some(resp.status_code),
                                Some(format!("status {}", resp.status_code)),
                            ),
                            Err(err) => (None, Some(err.to_string())),
                        };
                        if status == Some(403) {
                            state.reputation.report(&state.host, &ip, 403);
                        }

                        task.attempts += 1;
                        task.last_tried_ip = Some(ip.clone());

                        if (task.attempts as usize) < state.worker_count {
                            let _ = tx.send(task).await;
                        } else {
                            // Every candidate has had a try.
                            state.try_claim(TaskOutcome {
                                task_id: task.id,
                                ip: ip.clone(),
                                status,
                                success: false,
                                error,
                                duration,
                                attempts: task.attempts,
                                country: country.clone(),
                                city: city.clone(),
                            });
                        }
                    }
                }
            }
        }));
    }
    drop(tx);

    for handle in handles {
        let _ = handle.await;
    }

    let outcomes: Vec<TaskOutcome> = {
        let mut slots = state.results.lock().expect("result slots poisoned");
        std::mem::take(&mut *slots).into_iter().flatten().collect()
    };
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let failed = outcomes.len() - succeeded;

    info!(
        "dispatch for {host} finished: {succeeded} ok, {failed} failed in {:?}",
        started.elapsed()
    );

    DispatchReport {
        outcomes,
        succeeded,
        failed,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> Response {
        Response {
            status_code: status,
            status_text: String::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            http_version: "HTTP/2",
        }
    }

    fn candidates(ips: &[&str]) -> Vec<String> {
        ips.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_tasks_drain_to_the_healthy_ip() {
        // Two workers; only 2.2.2.2 answers 200. Every task must finish
        // successfully through it, and the 500s from 1.1.1.1 must not
        // quarantine anything.
        let reputation = Arc::new(ReputationMap::new());
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1", "2.2.2.2"]),
            3,
            false,
            Arc::clone(&reputation),
            HashMap::new(),
            CancellationToken::new(),
            |ip: String| async move {
                if ip == "2.2.2.2" {
                    Ok(response(200))
                } else {
                    Ok(response(500))
                }
            },
        )
        .await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.outcomes.len(), 3);
        for outcome in &report.outcomes {
            assert!(outcome.success);
            assert_eq!(outcome.ip, "2.2.2.2");
            assert_eq!(outcome.status, Some(200));
            assert!(outcome.attempts >= 1);
            assert!(outcome.attempts <= 2);
        }
        assert!(reputation.is_allowed("kh.google.com", "1.1.1.1"));
        assert!(reputation.is_allowed("kh.google.com", "2.2.2.2"));
    }

    #[tokio::test]
    async fn test_403_quarantines_the_worker_ip() {
        let reputation = Arc::new(ReputationMap::new());
        let report = run_tasks(
            "kh.google.com",
            candidates(&["3.3.3.3", "4.4.4.4"]),
            2,
            false,
            Arc::clone(&reputation),
            HashMap::new(),
            CancellationToken::new(),
            |ip: String| async move {
                if ip == "3.3.3.3" {
                    Ok(response(403))
                } else {
                    Ok(response(200))
                }
            },
        )
        .await;

        assert_eq!(report.succeeded, 2);
        assert!(!reputation.is_allowed("kh.google.com", "3.3.3.3"));
        assert!(reputation.is_allowed("kh.google.com", "4.4.4.4"));
    }

    #[tokio::test]
    async fn test_single_candidate_failure_is_final() {
        // With |P| == 1, one failed attempt exhausts the task.
        let reputation = Arc::new(ReputationMap::new());
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1"]),
            2,
            false,
            reputation,
            HashMap::new(),
            CancellationToken::new(),
            |_ip: String| async move { Ok(response(502)) },
        )
        .await;

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
        for outcome in &report.outcomes {
            assert_eq!(outcome.attempts, 1);
            assert_eq!(outcome.status, Some(502));
        }
    }

    #[tokio::test]
    async fn test_transport_errors_count_as_attempts() {
        let reputation = Arc::new(ReputationMap::new());
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1", "2.2.2.2"]),
            1,
            false,
            Arc::clone(&reputation),
            HashMap::new(),
            CancellationToken::new(),
            |ip: String| async move {
                Err(EngineError::InvalidUrl(format!("boom {ip}")))
            },
        )
        .await;

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 1);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.error.as_deref().unwrap().contains("boom"));
        // Plain failures never quarantine.
        assert!(reputation.is_allowed("kh.google.com", "1.1.1.1"));
    }

    #[tokio::test]
    async fn test_zero_tasks_is_a_noop() {
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1"]),
            0,
            false,
            Arc::new(ReputationMap::new()),
            HashMap::new(),
            CancellationToken::new(),
            |_ip: String| async move { Ok(response(200)) },
        )
        .await;
        assert!(report.outcomes.is_empty());
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_no_candidates_fails_everything_immediately() {
        let report = run_tasks(
            "kh.google.com",
            Vec::new(),
            3,
            false,
            Arc::new(ReputationMap::new()),
            HashMap::new(),
            CancellationToken::new(),
            |_ip: String| async move { Ok(response(200)) },
        )
        .await;

        assert_eq!(report.failed, 3);
        assert!(report
            .outcomes
            .iter()
            .all(|o| !o.success && o.attempts == 0));
    }

    #[tokio::test]
    async fn test_exactly_one_outcome_per_task() {
        // Everybody answers 200; racing workers must still record exactly
        // one outcome per task id.
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]),
            16,
            false,
            Arc::new(ReputationMap::new()),
            HashMap::new(),
            CancellationToken::new(),
            |_ip: String| async move { Ok(response(200)) },
        )
        .await;

        assert_eq!(report.outcomes.len(), 16);
        let mut ids: Vec<usize> = report.outcomes.iter().map(|o| o.task_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(report.succeeded, 16);
    }

    #[tokio::test]
    async fn test_geo_tags_flow_into_outcomes() {
        let geo = HashMap::from([(
            "1.1.1.1".to_string(),
            ("Japan".to_string(), "Tokyo".to_string()),
        )]);
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1"]),
            1,
            false,
            Arc::new(ReputationMap::new()),
            geo,
            CancellationToken::new(),
            |_ip: String| async move { Ok(response(200)) },
        )
        .await;

        assert_eq!(report.outcomes[0].country, "Japan");
        assert_eq!(report.outcomes[0].city, "Tokyo");
        let by_country = report.latency_by_country();
        assert_eq!(by_country.len(), 1);
        assert_eq!(by_country[0].key, "Japan");
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_run() {
        let stop = CancellationToken::new();
        stop.cancel();
        let report = run_tasks(
            "kh.google.com",
            candidates(&["1.1.1.1"]),
            4,
            false,
            Arc::new(ReputationMap::new()),
            HashMap::new(),
            stop,
            |_ip: String| async move { Ok(response(200)) },
        )
        .await;
        // Cancelled before any work: no recorded outcomes.
        assert!(report.outcomes.is_empty());
    }
}
