//! Sync protocol against the upstream directory API.
//!
//! The store prefers local data whenever the network disappoints: a failed
//! host-directory fetch keeps the local directory, a failed freshness probe
//! keeps the local detail pool, and per-host errors during `sync_all` are
//! logged and suppressed so partial progress survives.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::config::{
    DETAIL_FRESH_WINDOW, FRESHNESS_PROBE_TIMEOUT, HOSTS_FILE, SYNC_ALL_DEADLINE, SYNC_CONCURRENCY,
};
use crate::error_handling::PoolError;

use super::storage;
use super::types::{DetailFile, DirectoryResponse, FreshnessProbe, HostRecord, IpPool};
use super::PoolStore;

fn json_accept() -> HashMap<String, String> {
    HashMap::from([("Accept".to_string(), "application/json".to_string())])
}

impl PoolStore {
    /// Refreshes the host directory from `<base>/api/ipPool/` and persists
    /// it to `hosts.json`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Offline`] in offline mode, transport errors, a non-200
    /// directory status, or a JSON decode failure.
    pub async fn sync_hosts(&self) -> Result<(), PoolError> {
        if self.is_offline() {
            return Err(PoolError::Offline);
        }

        let url = format!("{}/api/ipPool/", self.base_url());
        let resp = self.sync_client().get(&url, json_accept()).await?;
        if resp.status_code != 200 {
            return Err(PoolError::UpstreamStatus(resp.status_code));
        }

        let directory: DirectoryResponse = serde_json::from_slice(&resp.body)?;
        self.install_hosts(directory.hosts.clone());

        // Persist failure keeps the in-memory state authoritative.
        match serde_json::to_vec_pretty(&directory) {
            Ok(pretty) => {
                let path = self.data_dir().join(HOSTS_FILE);
                if let Err(err) = tokio::fs::write(&path, pretty).await {
                    warn!("could not persist {}: {err}", path.display());
                }
            }
            Err(err) => warn!("could not serialize host directory: {err}"),
        }

        Ok(())
    }

    /// Fetches the simple pool for `host`, persists the raw bytes and
    /// installs the parsed pool atomically.
    ///
    /// # Errors
    ///
    /// Directory misses, transport errors, non-200 statuses and JSON
    /// decode failures. Offline mode is a silent no-op.
    pub async fn sync_ip_pool(&self, host: &str) -> Result<(), PoolError> {
        if self.is_offline() {
            return Ok(());
        }

        let record = self.host_record(host)?;
        if !record.exists {
            return Err(PoolError::PoolUnavailable(host.to_string()));
        }

        let url = format!("{}{}", self.base_url(), record.url);
        let resp = self.sync_client().get(&url, json_accept()).await?;
        if resp.status_code != 200 {
            return Err(PoolError::UpstreamStatus(resp.status_code));
        }

        let path = self.data_dir().join(storage::simple_file_name(host));
        if let Err(err) = tokio::fs::write(&path, &resp.body).await {
            warn!("could not persist {}: {err}", path.display());
        }

        let pool: IpPool = serde_json::from_slice(&resp.body)?;
        self.install_simple(host, pool);
        Ok(())
    }

    /// Fetches the detail pool for `host` when the server copy is newer
    /// than the local one (or unconditionally with `force`).
    ///
    /// A probe timeout or transport error during the freshness check keeps
    /// the local data and is not a failure.
    ///
    /// # Errors
    ///
    /// Directory misses, transport errors on the actual fetch, non-200
    /// statuses and JSON decode failures. Offline mode is a silent no-op.
    pub async fn sync_detail_pool(&self, host: &str, force: bool) -> Result<(), PoolError> {
        if self.is_offline() {
            return Ok(());
        }

        let record = self.host_record(host)?;
        if !record.detail_exists {
            return Err(PoolError::DetailUnavailable(host.to_string()));
        }

        if !force && !self.should_update_detail(host, &record).await {
            return Ok(());
        }

        let url = format!("{}{}", self.base_url(), record.detail_url);
        let resp = self.sync_client().get(&url, json_accept()).await?;
        if resp.status_code != 200 {
            return Err(PoolError::UpstreamStatus(resp.status_code));
        }

        let path = self.data_dir().join(storage::detail_file_name(host));
        if let Err(err) = tokio::fs::write(&path, &resp.body).await {
            warn!("could not persist {}: {err}", path.display());
        }

        let file: DetailFile = serde_json::from_slice(&resp.body)?;
        self.install_detail(host, file.into_pool());
        Ok(())
    }

    /// Staleness gate for `sync_detail_pool`.
    ///
    /// No local record → update. Local record younger than the freshness
    /// window → trust it. Otherwise ask the server for its
    /// `stats.last_updated` under a 5 s deadline and update only if it is
    /// strictly newer; any probe failure keeps the local data.
    async fn should_update_detail(&self, host: &str, record: &HostRecord) -> bool {
        let local_updated = {
            match self.detail_pool(host) {
                Ok(pool) => pool.stats.last_updated,
                Err(_) => return true,
            }
        };
        let Some(local_updated) = local_updated else {
            return true;
        };

        let age = (Utc::now() - local_updated).to_std().unwrap_or_default();
        if age < DETAIL_FRESH_WINDOW {
            return false;
        }

        match tokio::time::timeout(
            FRESHNESS_PROBE_TIMEOUT,
            self.fetch_server_last_updated(record),
        )
        .await
        {
            Ok(Ok(Some(server_updated))) => server_updated > local_updated,
            Ok(Ok(None)) => false,
            Ok(Err(err)) => {
                debug!("freshness probe for {host} failed, keeping local data: {err}");
                false
            }
            Err(_) => {
                debug!("freshness probe for {host} timed out, keeping local data");
                false
            }
        }
    }

    /// Downloads the detail document with the short-deadline probe client
    /// and extracts only `stats.last_updated`.
    async fn fetch_server_last_updated(
        &self,
        record: &HostRecord,
    ) -> Result<Option<DateTime<Utc>>, PoolError> {
        let url = format!("{}{}", self.base_url(), record.detail_url);
        let resp = self.probe_client().get(&url, json_accept()).await?;
        if resp.status_code != 200 {
            return Err(PoolError::UpstreamStatus(resp.status_code));
        }
        let probe: FreshnessProbe = serde_json::from_slice(&resp.body)?;
        Ok(probe.stats.last_updated)
    }

    /// Syncs the directory, then every host's simple and detail pools with
    /// at most ten host-syncs in flight. Bounded by a 60 s soft deadline:
    /// syncs already started keep running in the background after it.
    ///
    /// Per-host errors are logged and suppressed; a directory failure
    /// keeps the local directory. Offline mode returns immediately.
    pub async fn sync_all(self: &Arc<Self>) -> Result<(), PoolError> {
        if self.is_offline() {
            return Ok(());
        }

        if let Err(err) = self.sync_hosts().await {
            warn!("host directory sync failed, keeping local data: {err}");
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(SYNC_CONCURRENCY));
        let mut handles = Vec::new();

        for record in self.hosts() {
            if record.exists {
                let store = Arc::clone(self);
                let semaphore = Arc::clone(&semaphore);
                let host = record.host.clone();
                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    if let Err(err) = store.sync_ip_pool(&host).await {
                        debug!("simple pool sync for {host} failed: {err}");
                    }
                }));
            }
            if record.detail_exists {
                let store = Arc::clone(self);
                let semaphore = Arc::clone(&semaphore);
                let host = record.host.clone();
                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    if let Err(err) = store.sync_detail_pool(&host, false).await {
                        debug!("detail pool sync for {host} failed: {err}");
                    }
                }));
            }
        }

        let joined = futures::future::join_all(handles);
        if tokio::time::timeout(SYNC_ALL_DEADLINE, joined).await.is_err() {
            warn!(
                "sync_all exceeded its {}s deadline; remaining syncs continue in the background",
                SYNC_ALL_DEADLINE.as_secs()
            );
        }

        self.mark_synced();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::types::{DetailPool, PoolStats};

    fn offline_store_with_host() -> (tempfile::TempDir, Arc<PoolStore>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(HOSTS_FILE),
            r#"{"hosts": [{"host": "kh.google.com", "url": "/u", "detail_url": "/d",
                           "exists": true, "detail_exists": true}], "usage": ""}"#,
        )
        .unwrap();
        // A closed local port: any accidental request fails fast.
        let store = Arc::new(PoolStore::open("http://127.0.0.1:9", dir.path()));
        (dir, store)
    }

    #[tokio::test]
    async fn test_offline_sync_all_is_a_silent_noop() {
        let (_dir, store) = offline_store_with_host();
        store.set_offline(true);

        store.sync_all().await.unwrap();
        store.sync_ip_pool("kh.google.com").await.unwrap();
        store.sync_detail_pool("kh.google.com", true).await.unwrap();
        assert!(matches!(
            store.sync_hosts().await,
            Err(PoolError::Offline)
        ));
        assert!(!store.is_auto_sync_enabled());
    }

    #[tokio::test]
    async fn test_sync_ip_pool_unknown_host() {
        let (_dir, store) = offline_store_with_host();
        assert!(matches!(
            store.sync_ip_pool("nosuch.example").await,
            Err(PoolError::HostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_local_detail_skips_network_probe() {
        let (_dir, store) = offline_store_with_host();

        // A detail pool stamped "now" is inside the freshness window, so
        // sync_detail_pool returns without touching the network even with
        // an unreachable base URL.
        store.install_detail(
            "kh.google.com",
            DetailPool {
                ips: Default::default(),
                stats: PoolStats {
                    ipv4_count: 0,
                    ipv6_count: 0,
                    last_updated: Some(Utc::now()),
                },
            },
        );
        store
            .sync_detail_pool("kh.google.com", false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_all_survives_unreachable_upstream() {
        let (_dir, store) = offline_store_with_host();
        // Online but the directory endpoint refuses connections: the
        // failure is downgraded and the local directory stays.
        store.sync_all().await.unwrap();
        assert_eq!(store.hosts().len(), 1);
    }
}
