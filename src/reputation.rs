//! Per-host IP reputation.
//!
//! Every IP starts allowed. A 403 quarantines it for that host; a later
//! 200 lifts the quarantine. All other status codes leave reputation
//! untouched. State is process-local and never persisted.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use log::{debug, info};

use crate::config::QUARANTINE_SEED_ENV;

/// Quarantine sets keyed by hostname.
#[derive(Default)]
pub struct ReputationMap {
    quarantined: RwLock<HashMap<String, HashSet<String>>>,
}

impl ReputationMap {
    /// Creates an empty map: everything is allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// True unless `ip` is currently quarantined for `host`.
    pub fn is_allowed(&self, host: &str, ip: &str) -> bool {
        let quarantined = self.quarantined.read().expect("reputation lock poisoned");
        quarantined
            .get(host)
            .map_or(true, |set| !set.contains(ip))
    }

    /// Applies a status observation: 403 quarantines, 200 rehabilitates,
    /// anything else is ignored.
    pub fn report(&self, host: &str, ip: &str, status: u16) {
        match status {
            403 => {
                let mut quarantined =
                    self.quarantined.write().expect("reputation lock poisoned");
                let inserted = quarantined
                    .entry(host.to_string())
                    .or_default()
                    .insert(ip.to_string());
                if inserted {
                    debug!("quarantined {ip} for {host}");
                }
            }
            200 => {
                let mut quarantined =
                    self.quarantined.write().expect("reputation lock poisoned");
                if let Some(set) = quarantined.get_mut(host) {
                    if set.remove(ip) {
                        debug!("rehabilitated {ip} for {host}");
                    }
                    if set.is_empty() {
                        quarantined.remove(host);
                    }
                }
            }
            _ => {}
        }
    }

    /// Returns `ips` minus the quarantined set for `host`, preserving
    /// order. When nothing is quarantined the input is returned unchanged.
    pub fn filter(&self, host: &str, ips: Vec<String>) -> Vec<String> {
        if ips.is_empty() {
            return ips;
        }
        let quarantined = self.quarantined.read().expect("reputation lock poisoned");
        let Some(banned) = quarantined.get(host).filter(|set| !set.is_empty()) else {
            return ips;
        };
        ips.into_iter().filter(|ip| !banned.contains(ip)).collect()
    }

    /// Snapshot of the quarantined IPs for `host`.
    pub fn quarantined(&self, host: &str) -> Vec<String> {
        let quarantined = self.quarantined.read().expect("reputation lock poisoned");
        quarantined
            .get(host)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Preloads the quarantine set for `host`, as if each IP had just
    /// answered 403.
    pub fn seed<I, S>(&self, host: &str, ips: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0usize;
        for ip in ips {
            let ip = ip.as_ref().trim();
            if ip.is_empty() {
                continue;
            }
            self.report(host, ip, 403);
            count += 1;
        }
        if count > 0 {
            info!("seeded {count} quarantined IPs for {host}");
        }
    }

    /// Seeds the quarantine set for `host` from a comma-separated
    /// environment variable (defaults to `STEALTHPOOL_QUARANTINE_IPS`).
    pub fn seed_from_env(&self, host: &str, var: Option<&str>) {
        let var = var.unwrap_or(QUARANTINE_SEED_ENV);
        if let Ok(value) = std::env::var(var) {
            self.seed(host, value.split(','));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_allowed() {
        let map = ReputationMap::new();
        assert!(map.is_allowed("kh.google.com", "1.1.1.1"));
        assert!(map.quarantined("kh.google.com").is_empty());
    }

    #[test]
    fn test_transition_sequence() {
        // allowed --403--> quarantined --200--> allowed; everything else
        // is non-transitioning.
        let map = ReputationMap::new();
        let (host, ip) = ("kh.google.com", "1.2.3.4");

        map.report(host, ip, 403);
        assert!(!map.is_allowed(host, ip));

        map.report(host, ip, 500);
        assert!(!map.is_allowed(host, ip));

        map.report(host, ip, 200);
        assert!(map.is_allowed(host, ip));

        map.report(host, ip, 403);
        assert!(!map.is_allowed(host, ip));
    }

    #[test]
    fn test_non_transitioning_statuses() {
        let map = ReputationMap::new();
        let (host, ip) = ("h", "9.9.9.9");
        for status in [101u16, 204, 301, 404, 429, 502] {
            map.report(host, ip, status);
            assert!(map.is_allowed(host, ip), "status {status} must not ban");
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let map = ReputationMap::new();
        let host = "h";
        map.report(host, "2.2.2.2", 403);
        map.report(host, "4.4.4.4", 403);

        let ips: Vec<String> = ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let filtered = map.filter(host, ips);
        assert_eq!(filtered, vec!["1.1.1.1".to_string(), "3.3.3.3".to_string()]);
    }

    #[test]
    fn test_filter_identity_when_nothing_quarantined() {
        let map = ReputationMap::new();
        let ips: Vec<String> = vec!["1.1.1.1".into(), "2.2.2.2".into()];
        let filtered = map.filter("h", ips.clone());
        assert_eq!(filtered, ips);
    }

    #[test]
    fn test_reputation_is_per_host() {
        let map = ReputationMap::new();
        map.report("a.example", "1.1.1.1", 403);
        assert!(!map.is_allowed("a.example", "1.1.1.1"));
        assert!(map.is_allowed("b.example", "1.1.1.1"));
    }

    #[test]
    fn test_seed_skips_blank_entries() {
        let map = ReputationMap::new();
        map.seed("h", [" 1.1.1.1 ", "", "2.2.2.2"]);
        assert!(!map.is_allowed("h", "1.1.1.1"));
        assert!(!map.is_allowed("h", "2.2.2.2"));
        assert_eq!(map.quarantined("h").len(), 2);
    }
}
