//! Warm-up and quarantine rehabilitation.
//!
//! Warm-up issues one probe per allowed IP so the long-lived clients in
//! the connection pool hold established TLS/HTTP-2 sessions before timed
//! work starts. Rehabilitation probes only quarantined IPs; a 200 lifts
//! the quarantine and the warm connection stays in the pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{Method, RequestOptions};
use crate::config::{DEFAULT_REHAB_INTERVAL, REHAB_CONCURRENCY, WARMUP_CONCURRENCY};
use crate::connpool::ConnPoolManager;
use crate::pool::PoolStore;
use crate::reputation::ReputationMap;
use crate::utils::direct_url;

/// Which address family to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4 addresses of the pool.
    V4,
    /// IPv6 addresses of the pool.
    V6,
}

/// Target of a warm-up or rehabilitation pass.
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    /// Logical hostname.
    pub host: String,
    /// Resource path probed on every IP.
    pub path: String,
    /// Address family to probe.
    pub family: AddressFamily,
}

/// Result of a warm-up pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmupSummary {
    /// IPs probed (allowed ones only).
    pub attempted: usize,
    /// Probes that answered 200.
    pub succeeded: usize,
}

/// Result of a rehabilitation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RehabSummary {
    /// Quarantined IPs probed.
    pub probed: usize,
    /// IPs whose quarantine was lifted by a 200.
    pub rehabilitated: usize,
}

fn probe_headers(host: &str) -> HashMap<String, String> {
    HashMap::from([
        ("Host".to_string(), host.to_string()),
        ("Accept-Encoding".to_string(), "gzip".to_string()),
        ("User-Agent".to_string(), "Mozilla/5.0".to_string()),
    ])
}

async fn probe_ip(
    manager: &Arc<ConnPoolManager>,
    reputation: &Arc<ReputationMap>,
    host: &str,
    path: &str,
    ip: &str,
) -> bool {
    let Some(client) = manager.get(ip) else {
        return false;
    };
    let url = direct_url(ip, path);
    let options = RequestOptions {
        headers: probe_headers(host),
        host: Some(host.to_string()),
        body: None,
    };
    match client.execute(Method::GET, &url, &options).await {
        Ok(resp) => {
            manager.mark_result(ip, resp.status_code, true);
            // Reputation only reacts to 200/403; passing everything
            // through keeps the transition logic in one place.
            reputation.report(host, ip, resp.status_code);
            resp.status_code == 200
        }
        Err(_) => false,
    }
}

/// Probes every allowed IP of the chosen family once, keeping the warm
/// clients in `manager` and feeding each status to `reputation`.
///
/// # Errors
///
/// Fails when the host has no synced simple pool.
pub async fn warm_host(
    store: &PoolStore,
    reputation: &Arc<ReputationMap>,
    manager: &Arc<ConnPoolManager>,
    spec: &ProbeSpec,
) -> Result<WarmupSummary> {
    let pool = store
        .ip_pool(&spec.host)
        .with_context(|| format!("no simple pool for {}", spec.host))?;
    let ips = match spec.family {
        AddressFamily::V4 => pool.ipv4,
        AddressFamily::V6 => pool.ipv6,
    };
    if ips.is_empty() {
        return Ok(WarmupSummary::default());
    }

    let allowed = reputation.filter(&spec.host, ips);
    if allowed.is_empty() {
        info!("warm-up for {}: everything is quarantined", spec.host);
        return Ok(WarmupSummary::default());
    }

    manager.warm_up(&allowed);

    let semaphore = Arc::new(Semaphore::new(WARMUP_CONCURRENCY));
    let mut handles: Vec<JoinHandle<bool>> = Vec::with_capacity(allowed.len());
    for ip in &allowed {
        let semaphore = Arc::clone(&semaphore);
        let manager = Arc::clone(manager);
        let reputation = Arc::clone(reputation);
        let host = spec.host.clone();
        let path = spec.path.clone();
        let ip = ip.clone();
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return false;
            };
            probe_ip(&manager, &reputation, &host, &path, &ip).await
        }));
    }

    let results = futures::future::join_all(handles).await;
    let succeeded = results
        .into_iter()
        .filter(|result| matches!(result, Ok(true)))
        .count();

    info!(
        "warm-up for {}: {succeeded}/{} established",
        spec.host,
        allowed.len()
    );
    Ok(WarmupSummary {
        attempted: allowed.len(),
        succeeded,
    })
}

/// Probes only the quarantined IPs of the chosen family; a 200 lifts the
/// quarantine.
///
/// # Errors
///
/// Fails when the host has no synced simple pool.
pub async fn rehabilitate_host(
    store: &PoolStore,
    reputation: &Arc<ReputationMap>,
    manager: &Arc<ConnPoolManager>,
    spec: &ProbeSpec,
) -> Result<RehabSummary> {
    let pool = store
        .ip_pool(&spec.host)
        .with_context(|| format!("no simple pool for {}", spec.host))?;
    let ips = match spec.family {
        AddressFamily::V4 => pool.ipv4,
        AddressFamily::V6 => pool.ipv6,
    };

    let banned: Vec<String> = ips
        .into_iter()
        .filter(|ip| !reputation.is_allowed(&spec.host, ip))
        .collect();
    if banned.is_empty() {
        return Ok(RehabSummary::default());
    }

    manager.warm_up(&banned);

    let semaphore = Arc::new(Semaphore::new(REHAB_CONCURRENCY));
    let mut handles: Vec<JoinHandle<bool>> = Vec::with_capacity(banned.len());
    for ip in &banned {
        let semaphore = Arc::clone(&semaphore);
        let manager = Arc::clone(manager);
        let reputation = Arc::clone(reputation);
        let host = spec.host.clone();
        let path = spec.path.clone();
        let ip = ip.clone();
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return false;
            };
            probe_ip(&manager, &reputation, &host, &path, &ip).await
        }));
    }

    let results = futures::future::join_all(handles).await;
    let rehabilitated = results
        .into_iter()
        .filter(|result| matches!(result, Ok(true)))
        .count();

    info!(
        "rehabilitation for {}: {rehabilitated}/{} lifted",
        spec.host,
        banned.len()
    );
    Ok(RehabSummary {
        probed: banned.len(),
        rehabilitated,
    })
}

/// Spawns a periodic rehabilitation pass over both address families
/// (default period 20 minutes) until `token` is cancelled.
pub fn spawn_rehabilitation(
    store: Arc<PoolStore>,
    reputation: Arc<ReputationMap>,
    manager: Arc<ConnPoolManager>,
    host: String,
    path: String,
    interval: Option<Duration>,
    token: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.unwrap_or(DEFAULT_REHAB_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for family in [AddressFamily::V6, AddressFamily::V4] {
                        let spec = ProbeSpec {
                            host: host.clone(),
                            path: path.clone(),
                            family,
                        };
                        if let Err(err) =
                            rehabilitate_host(&store, &reputation, &manager, &spec).await
                        {
                            warn!("rehabilitation pass for {host} failed: {err:#}");
                        }
                    }
                }
                _ = token.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::fingerprint::ClientHelloId;

    fn empty_store() -> (tempfile::TempDir, PoolStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PoolStore::open("http://directory.invalid", dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_warm_host_without_pool_errors() {
        let (_dir, store) = empty_store();
        let reputation = Arc::new(ReputationMap::new());
        let manager = Arc::new(ConnPoolManager::new(
            ClientHelloId::chrome_latest(),
            ClientConfig::default(),
        ));
        let spec = ProbeSpec {
            host: "kh.google.com".into(),
            path: "rt/earth/PlanetoidMetadata".into(),
            family: AddressFamily::V4,
        };
        assert!(warm_host(&store, &reputation, &manager, &spec).await.is_err());
    }

    #[tokio::test]
    async fn test_rehabilitate_with_empty_quarantine_is_noop() {
        let (dir, _) = empty_store();
        std::fs::write(
            dir.path().join("hosts.json"),
            r#"{"hosts": [{"host": "kh.google.com", "url": "/u", "exists": true, "detail_exists": false}], "usage": ""}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("kh_google_com.json"),
            r#"{"ipv4": ["1.1.1.1"]}"#,
        )
        .unwrap();
        let store = PoolStore::open("http://directory.invalid", dir.path());
        let reputation = Arc::new(ReputationMap::new());
        let manager = Arc::new(ConnPoolManager::new(
            ClientHelloId::chrome_latest(),
            ClientConfig::default(),
        ));
        let spec = ProbeSpec {
            host: "kh.google.com".into(),
            path: "rt/earth/PlanetoidMetadata".into(),
            family: AddressFamily::V4,
        };

        let summary = rehabilitate_host(&store, &reputation, &manager, &spec)
            .await
            .unwrap();
        assert_eq!(summary.probed, 0);
        assert_eq!(summary.rehabilitated, 0);
        // No clients were materialized for a no-op pass.
        assert!(manager.is_empty());
    }
}
