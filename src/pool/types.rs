//! Wire and in-memory data model for the IP-pool directory.
//!
//! Parsing is tolerant by design: unknown fields are ignored, absent
//! fields default to empty, and a malformed `last_updated` degrades to
//! `None` instead of failing the whole document.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Envelope returned by `GET <base>/api/ipPool/` and stored in
/// `hosts.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryResponse {
    /// Directory of hosts with published pools.
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
    /// Free-form usage text from the server.
    #[serde(default)]
    pub usage: String,
}

/// One host entry of the upstream directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// FQDN the pools belong to.
    #[serde(default)]
    pub host: String,
    /// Server-side file name of the simple pool.
    #[serde(default)]
    pub file_name: String,
    /// Server-side file name of the detail pool.
    #[serde(default)]
    pub detail_file: String,
    /// Path of the simple pool, relative to the base URL.
    #[serde(default)]
    pub url: String,
    /// Path of the detail pool, relative to the base URL.
    #[serde(default)]
    pub detail_url: String,
    /// Whether the simple pool is published.
    #[serde(default)]
    pub exists: bool,
    /// Whether the detail pool is published.
    #[serde(default)]
    pub detail_exists: bool,
}

/// Simple pool: ordered, distinct address lists as supplied by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPool {
    /// IPv4 addresses, server order preserved.
    #[serde(default)]
    pub ipv4: Vec<String>,
    /// IPv6 addresses, server order preserved.
    #[serde(default)]
    pub ipv6: Vec<String>,
}

/// Geolocation record for one IP. All fields are free-form and may be
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpGeoRecord {
    /// The address itself.
    pub ip: String,
    /// Country name.
    pub country: String,
    /// Region/state name.
    pub region: String,
    /// City name.
    pub city: String,
    /// ISP name.
    pub isp: String,
    /// Organization name.
    pub org: String,
    /// Data-center label.
    pub data_center: String,
    /// Address classification, e.g. `"datacenter"`.
    pub ip_type: String,
}

/// Counters and freshness stamp of a detail pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of IPv4 records.
    pub ipv4_count: usize,
    /// Number of IPv6 records.
    pub ipv6_count: usize,
    /// Server-side generation time, when parseable.
    pub last_updated: Option<DateTime<Utc>>,
}

/// In-memory detail pool: per-IP geo records plus stats.
#[derive(Debug, Clone, Default)]
pub struct DetailPool {
    /// Geo record per address (IPv4 and IPv6 merged).
    pub ips: HashMap<String, IpGeoRecord>,
    /// Counters and freshness stamp.
    pub stats: PoolStats,
}

/// Summary of what the on-disk cache currently holds.
#[derive(Debug, Clone)]
pub struct LocalDataInfo {
    /// Directory the cache lives in.
    pub data_dir: std::path::PathBuf,
    /// Whether `hosts.json` is present.
    pub hosts_file_exists: bool,
    /// How many per-host simple pool files are present.
    pub pool_file_count: usize,
}

// ---- wire-side shapes -------------------------------------------------

fn tolerant_rfc3339<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireStats {
    #[serde(default)]
    pub ipv4_count: usize,
    #[serde(default)]
    pub ipv6_count: usize,
    #[serde(default, deserialize_with = "tolerant_rfc3339")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireLocation {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub isp: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub data_center: String,
    #[serde(default)]
    pub ip_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WireDetailEntry {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub location: WireLocation,
}

/// The detail document as served and as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DetailFile {
    #[serde(default)]
    pub stats: WireStats,
    #[serde(default)]
    pub ipv4_detailed: HashMap<String, WireDetailEntry>,
    #[serde(default)]
    pub ipv6_detailed: HashMap<String, WireDetailEntry>,
}

/// Minimal view of the detail document for the freshness probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FreshnessProbe {
    #[serde(default)]
    pub stats: WireStats,
}

impl DetailFile {
    /// Flattens the wire document into the in-memory pool shape. The map
    /// key is authoritative when an entry omits its own `ip` field.
    pub(crate) fn into_pool(self) -> DetailPool {
        let mut ips = HashMap::with_capacity(self.ipv4_detailed.len() + self.ipv6_detailed.len());
        for (key, entry) in self
            .ipv4_detailed
            .into_iter()
            .chain(self.ipv6_detailed.into_iter())
        {
            let ip = if entry.ip.is_empty() { key } else { entry.ip };
            ips.insert(
                ip.clone(),
                IpGeoRecord {
                    ip,
                    country: entry.location.country,
                    region: entry.location.region,
                    city: entry.location.city,
                    isp: entry.location.isp,
                    org: entry.location.org,
                    data_center: entry.location.data_center,
                    ip_type: entry.location.ip_type,
                },
            );
        }
        DetailPool {
            ips,
            stats: PoolStats {
                ipv4_count: self.stats.ipv4_count,
                ipv6_count: self.stats.ipv6_count,
                last_updated: self.stats.last_updated,
            },
        }
    }
}
