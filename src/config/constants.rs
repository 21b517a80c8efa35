//! Default tunables for transports, sync and dispatch.
//!
//! Everything here is a default; the corresponding config structs accept
//! overrides where it makes sense to tune per deployment.

use std::time::Duration;

/// Client-wide request deadline for long-lived clients.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request deadline for dispatcher workers. Short on purpose: a slow IP
/// should lose the task to a faster one, not hold it.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for directory/pool sync requests.
pub const SYNC_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for the detail-pool freshness probe.
pub const FRESHNESS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A detail pool younger than this is trusted without probing the server.
pub const DETAIL_FRESH_WINDOW: Duration = Duration::from_secs(6 * 60 * 60);

/// Soft cap on a whole `sync_all` pass; work started keeps running in the
/// background past this point.
pub const SYNC_ALL_DEADLINE: Duration = Duration::from_secs(60);

/// Maximum outstanding per-host syncs during `sync_all`.
pub const SYNC_CONCURRENCY: usize = 10;

/// Default auto-sync period.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Maximum concurrent warm-up probes.
pub const WARMUP_CONCURRENCY: usize = 64;

/// Maximum concurrent rehabilitation probes.
pub const REHAB_CONCURRENCY: usize = 32;

/// Default period between rehabilitation passes over quarantined IPs.
pub const DEFAULT_REHAB_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Bounded wait on the dispatcher task queue. Workers re-check the
/// remaining-task counter at least this often.
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Yield after putting a task back because this worker just tried it.
pub const REQUEUE_YIELD: Duration = Duration::from_millis(1);

/// Idle-connection budget for the HTTP/1.1 fallback transport.
pub const H1_POOL_IDLE_PER_HOST: usize = 10;

/// Idle-connection lifetime for the HTTP/1.1 fallback transport.
pub const H1_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default on-disk directory for the pool cache.
pub const DEFAULT_DATA_DIR: &str = "./ippool_data";

/// File holding the synced host directory.
pub const HOSTS_FILE: &str = "hosts.json";

/// Suffix for per-host detail pool files.
pub const DETAIL_FILE_SUFFIX: &str = "_detail";

/// Environment variable consulted by the reputation seed hook.
pub const QUARANTINE_SEED_ENV: &str = "STEALTHPOOL_QUARANTINE_IPS";
