//! Read-only queries over the IP-pool store.
//!
//! Every method returns an owned snapshot assembled under the store's read
//! locks; nothing here mutates state or performs I/O.

use std::collections::HashMap;

use crate::error_handling::PoolError;
use crate::pool::{IpGeoRecord, PoolStore};

/// Aggregate view of one host's pools, or of the whole directory.
#[derive(Debug, Clone, Default)]
pub struct PoolAnalysis {
    /// Hosts covered by this analysis.
    pub total_hosts: usize,
    /// IPv4 addresses across the covered simple pools.
    pub total_ipv4: usize,
    /// IPv6 addresses across the covered simple pools.
    pub total_ipv6: usize,
    /// Country → record count.
    pub countries: HashMap<String, usize>,
    /// Region → record count.
    pub regions: HashMap<String, usize>,
    /// City → record count.
    pub cities: HashMap<String, usize>,
    /// ISP → record count.
    pub isps: HashMap<String, usize>,
    /// Organization → record count.
    pub orgs: HashMap<String, usize>,
    /// Data-center label → record count.
    pub data_centers: HashMap<String, usize>,
    /// IP type → record count.
    pub ip_types: HashMap<String, usize>,
}

impl PoolAnalysis {
    fn absorb(&mut self, record: &IpGeoRecord) {
        let bump = |map: &mut HashMap<String, usize>, key: &str| {
            if !key.is_empty() {
                *map.entry(key.to_string()).or_default() += 1;
            }
        };
        bump(&mut self.countries, &record.country);
        bump(&mut self.regions, &record.region);
        bump(&mut self.cities, &record.city);
        bump(&mut self.isps, &record.isp);
        bump(&mut self.orgs, &record.org);
        bump(&mut self.data_centers, &record.data_center);
        bump(&mut self.ip_types, &record.ip_type);
    }
}

/// Multi-criteria search filter; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Restrict to one host (all hosts when empty).
    pub host: String,
    /// Country filter.
    pub country: String,
    /// City filter.
    pub city: String,
    /// ISP filter.
    pub isp: String,
    /// Data-center filter.
    pub data_center: String,
}

/// Read-only analyzer borrowing the store.
pub struct PoolAnalyzer<'a> {
    store: &'a PoolStore,
}

impl<'a> PoolAnalyzer<'a> {
    /// Creates an analyzer over `store`.
    pub fn new(store: &'a PoolStore) -> Self {
        PoolAnalyzer { store }
    }

    /// Aggregates the whole directory: totals from the simple pools,
    /// histograms from the detail pools. Hosts without synced data are
    /// skipped silently.
    pub fn analyze_all(&self) -> PoolAnalysis {
        let hosts = self.store.hosts();
        let mut analysis = PoolAnalysis {
            total_hosts: hosts.len(),
            ..PoolAnalysis::default()
        };

        for record in &hosts {
            if let Ok(pool) = self.store.ip_pool(&record.host) {
                analysis.total_ipv4 += pool.ipv4.len();
                analysis.total_ipv6 += pool.ipv6.len();
            }
            if let Ok(detail) = self.store.detail_pool(&record.host) {
                for geo in detail.ips.values() {
                    analysis.absorb(geo);
                }
            }
        }

        analysis
    }

    /// Aggregates a single host.
    ///
    /// # Errors
    ///
    /// [`PoolError::DetailMissing`] when the host has no detail pool; the
    /// simple-pool totals alone are not considered an analysis.
    pub fn analyze_host(&self, host: &str) -> Result<PoolAnalysis, PoolError> {
        let mut analysis = PoolAnalysis {
            total_hosts: 1,
            ..PoolAnalysis::default()
        };

        if let Ok(pool) = self.store.ip_pool(host) {
            analysis.total_ipv4 = pool.ipv4.len();
            analysis.total_ipv6 = pool.ipv6.len();
        }

        let detail = self.store.detail_pool(host)?;
        for geo in detail.ips.values() {
            analysis.absorb(geo);
        }
        Ok(analysis)
    }

    fn collect_matching(&self, matches: impl Fn(&IpGeoRecord) -> bool) -> Vec<IpGeoRecord> {
        let mut result = Vec::new();
        for record in self.store.hosts() {
            let Ok(detail) = self.store.detail_pool(&record.host) else {
                continue;
            };
            result.extend(detail.ips.values().filter(|geo| matches(geo)).cloned());
        }
        result
    }

    /// All records located in `country`.
    pub fn by_country(&self, country: &str) -> Vec<IpGeoRecord> {
        self.collect_matching(|geo| geo.country == country)
    }

    /// All records located in `city`.
    pub fn by_city(&self, city: &str) -> Vec<IpGeoRecord> {
        self.collect_matching(|geo| geo.city == city)
    }

    /// All records served by `isp`.
    pub fn by_isp(&self, isp: &str) -> Vec<IpGeoRecord> {
        self.collect_matching(|geo| geo.isp == isp)
    }

    /// All records hosted in `data_center`.
    pub fn by_data_center(&self, data_center: &str) -> Vec<IpGeoRecord> {
        self.collect_matching(|geo| geo.data_center == data_center)
    }

    /// Country → record count over the whole directory.
    pub fn countries(&self) -> HashMap<String, usize> {
        self.analyze_all().countries
    }

    /// City → record count for one country.
    pub fn cities_in_country(&self, country: &str) -> HashMap<String, usize> {
        let mut cities = HashMap::new();
        for geo in self.by_country(country) {
            if !geo.city.is_empty() {
                *cities.entry(geo.city).or_default() += 1;
            }
        }
        cities
    }

    /// Records matching both filters; an empty filter matches everything.
    pub fn ips_in_country_city(&self, country: &str, city: &str) -> Vec<IpGeoRecord> {
        self.collect_matching(|geo| {
            (country.is_empty() || geo.country == country)
                && (city.is_empty() || geo.city == city)
        })
    }

    /// Records matching every non-empty criterion.
    pub fn search(&self, criteria: &SearchCriteria) -> Vec<IpGeoRecord> {
        let hosts: Vec<String> = if criteria.host.is_empty() {
            self.store.hosts().into_iter().map(|h| h.host).collect()
        } else {
            vec![criteria.host.clone()]
        };

        let mut result = Vec::new();
        for host in hosts {
            let Ok(detail) = self.store.detail_pool(&host) else {
                continue;
            };
            for geo in detail.ips.values() {
                let matched = (criteria.country.is_empty() || geo.country == criteria.country)
                    && (criteria.city.is_empty() || geo.city == criteria.city)
                    && (criteria.isp.is_empty() || geo.isp == criteria.isp)
                    && (criteria.data_center.is_empty()
                        || geo.data_center == criteria.data_center);
                if matched {
                    result.push(geo.clone());
                }
            }
        }
        result
    }

    /// Defensive copies of the host's address lists.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolMissing`] when the host has no synced simple pool.
    pub fn all_ips(&self, host: &str) -> Result<(Vec<String>, Vec<String>), PoolError> {
        let pool = self.store.ip_pool(host)?;
        Ok((pool.ipv4, pool.ipv6))
    }

    /// One address for `host`, preferring the IPv4 list.
    ///
    /// Deterministic on purpose: returns the first element (IPv4 order
    /// first, then IPv6). Callers wanting true randomness select from
    /// [`PoolAnalyzer::all_ips`] themselves.
    ///
    /// # Errors
    ///
    /// [`PoolError::PoolMissing`] or [`PoolError::NoAddresses`].
    pub fn random_ip(&self, host: &str) -> Result<String, PoolError> {
        let pool = self.store.ip_pool(host)?;
        pool.ipv4
            .first()
            .or_else(|| pool.ipv6.first())
            .cloned()
            .ok_or_else(|| PoolError::NoAddresses(host.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HOSTS_FILE;

    fn fixture_store() -> (tempfile::TempDir, PoolStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(HOSTS_FILE),
            r#"{"hosts": [
                {"host": "kh.google.com", "url": "/u1", "detail_url": "/d1",
                 "exists": true, "detail_exists": true},
                {"host": "khmdb.google.com", "url": "/u2", "detail_url": "/d2",
                 "exists": true, "detail_exists": true}
            ], "usage": ""}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("kh_google_com.json"),
            r#"{"ipv4": ["1.1.1.1", "2.2.2.2"], "ipv6": ["2001:db8::1"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("kh_google_com_detail.json"),
            r#"{"stats": {"ipv4_count": 2, "ipv6_count": 1, "last_updated": "2026-01-15T08:30:00Z"},
                "ipv4_detailed": {
                    "1.1.1.1": {"ip": "1.1.1.1", "location": {"country": "United States", "region": "California", "city": "Los Angeles", "isp": "Google LLC", "data_center": "LAX", "ip_type": "datacenter"}},
                    "2.2.2.2": {"ip": "2.2.2.2", "location": {"country": "Japan", "city": "Tokyo", "isp": "Google LLC", "data_center": "NRT", "ip_type": "datacenter"}}
                },
                "ipv6_detailed": {
                    "2001:db8::1": {"ip": "2001:db8::1", "location": {"country": "United States", "city": "Dalles", "isp": "Google LLC", "data_center": "DLS", "ip_type": "datacenter"}}
                }}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("khmdb_google_com.json"),
            r#"{"ipv4": ["3.3.3.3"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("khmdb_google_com_detail.json"),
            r#"{"stats": {"ipv4_count": 1, "ipv6_count": 0, "last_updated": "2026-01-15T08:30:00Z"},
                "ipv4_detailed": {
                    "3.3.3.3": {"ip": "3.3.3.3", "location": {"country": "Japan", "city": "Osaka", "isp": "Example ISP"}}
                }}"#,
        )
        .unwrap();
        let store = PoolStore::open("http://directory.invalid", dir.path());
        (dir, store)
    }

    #[test]
    fn test_analyze_all_totals_and_histograms() {
        let (_dir, store) = fixture_store();
        let analysis = PoolAnalyzer::new(&store).analyze_all();

        assert_eq!(analysis.total_hosts, 2);
        assert_eq!(analysis.total_ipv4, 3);
        assert_eq!(analysis.total_ipv6, 1);
        assert_eq!(analysis.countries["United States"], 2);
        assert_eq!(analysis.countries["Japan"], 2);
        assert_eq!(analysis.isps["Google LLC"], 3);
        assert_eq!(analysis.data_centers.len(), 3);
        // Empty fields are not counted.
        assert!(!analysis.regions.contains_key(""));
    }

    #[test]
    fn test_analyze_host() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);

        let analysis = analyzer.analyze_host("kh.google.com").unwrap();
        assert_eq!(analysis.total_ipv4, 2);
        assert_eq!(analysis.total_ipv6, 1);
        assert_eq!(analysis.cities["Tokyo"], 1);

        assert!(analyzer.analyze_host("nosuch.example").is_err());
    }

    #[test]
    fn test_attribute_lookups() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);

        assert_eq!(analyzer.by_country("Japan").len(), 2);
        assert_eq!(analyzer.by_city("Tokyo").len(), 1);
        assert_eq!(analyzer.by_isp("Google LLC").len(), 3);
        assert_eq!(analyzer.by_data_center("LAX").len(), 1);
        assert!(analyzer.by_country("Atlantis").is_empty());
    }

    #[test]
    fn test_country_city_queries() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);

        let countries = analyzer.countries();
        assert_eq!(countries["Japan"], 2);

        let cities = analyzer.cities_in_country("Japan");
        assert_eq!(cities["Tokyo"], 1);
        assert_eq!(cities["Osaka"], 1);

        let tokyo = analyzer.ips_in_country_city("Japan", "Tokyo");
        assert_eq!(tokyo.len(), 1);
        assert_eq!(tokyo[0].ip, "2.2.2.2");

        // Empty filters match everything.
        assert_eq!(analyzer.ips_in_country_city("", "").len(), 4);
    }

    #[test]
    fn test_search() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);

        let hits = analyzer.search(&SearchCriteria {
            host: "kh.google.com".into(),
            country: "United States".into(),
            ..SearchCriteria::default()
        });
        assert_eq!(hits.len(), 2);

        let none = analyzer.search(&SearchCriteria {
            country: "Japan".into(),
            isp: "Google LLC".into(),
            city: "Osaka".into(),
            ..SearchCriteria::default()
        });
        assert!(none.is_empty());
    }

    #[test]
    fn test_all_ips_is_a_copy() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);
        let (mut v4, v6) = analyzer.all_ips("kh.google.com").unwrap();
        v4.clear();
        // Clearing the copy leaves the store untouched.
        let (again, _) = analyzer.all_ips("kh.google.com").unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(v6.len(), 1);
    }

    #[test]
    fn test_random_ip_prefers_first_ipv4() {
        let (_dir, store) = fixture_store();
        let analyzer = PoolAnalyzer::new(&store);
        assert_eq!(analyzer.random_ip("kh.google.com").unwrap(), "1.1.1.1");
        assert!(matches!(
            analyzer.random_ip("nosuch.example"),
            Err(PoolError::PoolMissing(_))
        ));
    }
}
