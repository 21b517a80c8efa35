//! IP-pool store: the authoritative in-memory view of the host directory
//! and per-host address pools, backed by an on-disk cache and an upstream
//! JSON API.
//!
//! Each shared map sits behind its own reader-writer lock; read paths copy
//! state out and never hold a lock across I/O. Lock acquisition order,
//! where more than one is needed: hosts, then simple pools, then detail
//! pools, then `host_last_updated`.

mod storage;
mod sync;
mod types;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::client::{Client, ClientConfig};
use crate::config::{
    DEFAULT_DATA_DIR, DEFAULT_SYNC_INTERVAL, FRESHNESS_PROBE_TIMEOUT, HOSTS_FILE,
    SYNC_CLIENT_TIMEOUT,
};
use crate::error_handling::PoolError;
use crate::fingerprint::ClientHelloId;

pub use storage::sanitize_host;
pub use types::{
    DetailPool, DirectoryResponse, HostRecord, IpGeoRecord, IpPool, LocalDataInfo, PoolStats,
};

struct AutoSync {
    token: CancellationToken,
}

/// Locally cached, incrementally synchronized directory of
/// hostname → address pools with per-IP geolocation.
pub struct PoolStore {
    base_url: String,
    data_dir: PathBuf,
    client: Client,
    probe_client: Client,
    offline: RwLock<bool>,
    hosts: RwLock<Vec<HostRecord>>,
    ip_pools: RwLock<HashMap<String, IpPool>>,
    detail_pools: RwLock<HashMap<String, DetailPool>>,
    host_last_updated: RwLock<HashMap<String, DateTime<Utc>>>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    auto_sync: Mutex<Option<AutoSync>>,
}

impl PoolStore {
    /// Opens a store rooted at `data_dir` (the default directory when
    /// empty), loading whatever the on-disk cache holds. Never fails:
    /// missing files mean an empty store, corrupt files are skipped.
    pub fn open(base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let base_url = base_url.into();
        let mut data_dir = data_dir.into();
        if data_dir.as_os_str().is_empty() {
            data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        }
        if let Err(err) = std::fs::create_dir_all(&data_dir) {
            debug!("could not create {}: {err}", data_dir.display());
        }

        let client = Client::new(
            ClientHelloId::chrome_latest(),
            ClientConfig {
                timeout: SYNC_CLIENT_TIMEOUT,
                ..ClientConfig::default()
            },
        );
        let probe_client = Client::new(
            ClientHelloId::chrome_latest(),
            ClientConfig {
                timeout: FRESHNESS_PROBE_TIMEOUT,
                ..ClientConfig::default()
            },
        );

        let store = PoolStore {
            base_url,
            data_dir,
            client,
            probe_client,
            offline: RwLock::new(false),
            hosts: RwLock::new(Vec::new()),
            ip_pools: RwLock::new(HashMap::new()),
            detail_pools: RwLock::new(HashMap::new()),
            host_last_updated: RwLock::new(HashMap::new()),
            last_sync: RwLock::new(None),
            auto_sync: Mutex::new(None),
        };
        store.load_local();
        store
    }

    fn load_local(&self) {
        let Some(directory) = storage::load_hosts(&self.data_dir) else {
            return;
        };
        self.install_hosts(directory.hosts);
        for record in self.hosts() {
            if let Some(pool) = storage::load_simple(&self.data_dir, &record.host) {
                self.install_simple(&record.host, pool);
            }
            if record.detail_exists {
                if let Some(detail) = storage::load_detail(&self.data_dir, &record.host) {
                    self.install_detail(&record.host, detail);
                }
            }
        }
    }

    // ---- offline mode -------------------------------------------------

    /// Switches offline mode. While offline every `sync_*` call returns
    /// early without network I/O.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.write().expect("offline flag poisoned") = offline;
    }

    /// Whether offline mode is active.
    pub fn is_offline(&self) -> bool {
        *self.offline.read().expect("offline flag poisoned")
    }

    // ---- read path ----------------------------------------------------

    /// Snapshot of the host directory.
    pub fn hosts(&self) -> Vec<HostRecord> {
        self.hosts.read().expect("hosts lock poisoned").clone()
    }

    /// The directory entry for `host`.
    ///
    /// # Errors
    ///
    /// [`PoolError::HostNotFound`] when the directory has no such host.
    pub fn host_record(&self, host: &str) -> Result<HostRecord, PoolError> {
        self.hosts
            .read()
            .expect("hosts lock poisoned")
            .iter()
            .find(|h| h.host == host)
            .cloned()
            .ok_or_else(|| PoolError::HostNotFound(host.to_string()))
    }

    /// The simple pool for `host`.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolMissing`] when nothing has been synced or loaded.
    pub fn ip_pool(&self, host: &str) -> Result<IpPool, PoolError> {
        self.ip_pools
            .read()
            .expect("ip pools lock poisoned")
            .get(host)
            .cloned()
            .ok_or_else(|| PoolError::PoolMissing(host.to_string()))
    }

    /// The detail pool for `host`.
    ///
    /// # Errors
    ///
    /// [`PoolError::DetailMissing`] when nothing has been synced or loaded.
    pub fn detail_pool(&self, host: &str) -> Result<DetailPool, PoolError> {
        self.detail_pools
            .read()
            .expect("detail pools lock poisoned")
            .get(host)
            .cloned()
            .ok_or_else(|| PoolError::DetailMissing(host.to_string()))
    }

    /// The geo record for one IP of `host`.
    ///
    /// # Errors
    ///
    /// [`PoolError::DetailMissing`] or [`PoolError::IpNotFound`].
    pub fn ip_detail(&self, host: &str, ip: &str) -> Result<IpGeoRecord, PoolError> {
        self.detail_pools
            .read()
            .expect("detail pools lock poisoned")
            .get(host)
            .ok_or_else(|| PoolError::DetailMissing(host.to_string()))?
            .ips
            .get(ip)
            .cloned()
            .ok_or_else(|| PoolError::IpNotFound {
                host: host.to_string(),
                ip: ip.to_string(),
            })
    }

    /// The server-side freshness stamp last seen for `host`.
    pub fn host_last_updated(&self, host: &str) -> Option<DateTime<Utc>> {
        self.host_last_updated
            .read()
            .expect("last-updated lock poisoned")
            .get(host)
            .copied()
    }

    /// When the last `sync_all` pass finished.
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().expect("last-sync lock poisoned")
    }

    /// What the on-disk cache currently holds.
    pub fn local_data_info(&self) -> LocalDataInfo {
        let hosts_file_exists = self.data_dir.join(HOSTS_FILE).exists();
        let pool_file_count = self
            .hosts()
            .iter()
            .filter(|record| {
                self.data_dir
                    .join(storage::simple_file_name(&record.host))
                    .exists()
            })
            .count();
        LocalDataInfo {
            data_dir: self.data_dir.clone(),
            hosts_file_exists,
            pool_file_count,
        }
    }

    // ---- write path (sync installs) -----------------------------------

    pub(crate) fn install_hosts(&self, hosts: Vec<HostRecord>) {
        *self.hosts.write().expect("hosts lock poisoned") = hosts;
    }

    pub(crate) fn install_simple(&self, host: &str, pool: IpPool) {
        self.ip_pools
            .write()
            .expect("ip pools lock poisoned")
            .insert(host.to_string(), pool);
    }

    pub(crate) fn install_detail(&self, host: &str, pool: DetailPool) {
        let stamp = pool.stats.last_updated;
        self.detail_pools
            .write()
            .expect("detail pools lock poisoned")
            .insert(host.to_string(), pool);
        if let Some(stamp) = stamp {
            let mut last_updated = self
                .host_last_updated
                .write()
                .expect("last-updated lock poisoned");
            let entry = last_updated.entry(host.to_string()).or_insert(stamp);
            // Monotonically non-decreasing per host.
            if stamp > *entry {
                *entry = stamp;
            }
        }
    }

    pub(crate) fn mark_synced(&self) {
        *self.last_sync.write().expect("last-sync lock poisoned") = Some(Utc::now());
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    pub(crate) fn sync_client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn probe_client(&self) -> &Client {
        &self.probe_client
    }

    // ---- auto-sync ----------------------------------------------------

    /// Starts periodic `sync_all` with the given period (default 5 min).
    ///
    /// # Errors
    ///
    /// [`PoolError::AutoSyncRunning`] if a timer is already active.
    pub fn start_auto_sync(
        self: &Arc<Self>,
        interval: Option<Duration>,
    ) -> Result<(), PoolError> {
        let interval = interval.unwrap_or(DEFAULT_SYNC_INTERVAL);
        let mut guard = self.auto_sync.lock().expect("auto-sync lock poisoned");
        if guard.is_some() {
            return Err(PoolError::AutoSyncRunning);
        }

        let token = CancellationToken::new();
        let child = token.child_token();
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the period
            // starts now.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = store.sync_all().await;
                    }
                    _ = child.cancelled() => break,
                }
            }
        });

        *guard = Some(AutoSync { token });
        Ok(())
    }

    /// Stops the periodic sync. Idempotent.
    pub fn stop_auto_sync(&self) {
        if let Some(auto) = self
            .auto_sync
            .lock()
            .expect("auto-sync lock poisoned")
            .take()
        {
            auto.token.cancel();
        }
    }

    /// Whether the periodic sync timer is running.
    pub fn is_auto_sync_enabled(&self) -> bool {
        self.auto_sync
            .lock()
            .expect("auto-sync lock poisoned")
            .is_some()
    }
}

impl Drop for PoolStore {
    fn drop(&mut self) {
        self.stop_auto_sync();
    }
}
