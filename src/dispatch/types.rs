//! Dispatcher results and aggregate reporting.

use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one task: either the first 200 or the final failure.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task id, `0..task_count`.
    pub task_id: usize,
    /// IP of the worker that recorded this outcome.
    pub ip: String,
    /// Status code of the recorded attempt, when a response arrived.
    pub status: Option<u16>,
    /// True iff the recorded attempt returned 200.
    pub success: bool,
    /// Error text of the recorded attempt, for failures.
    pub error: Option<String>,
    /// Wall-clock duration of the recorded attempt.
    pub duration: Duration,
    /// Attempts made on this task up to and including the recorded one.
    pub attempts: u32,
    /// Country of the recording worker's IP, when known.
    pub country: String,
    /// City of the recording worker's IP, when known.
    pub city: String,
}

/// Average latency for one geography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLatency {
    /// Country, or `country/city`.
    pub key: String,
    /// Mean duration of successful tasks recorded there.
    pub average: Duration,
    /// Number of successful tasks recorded there.
    pub count: usize,
}

/// Summary of a dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Per-task outcomes, in task-id order. A task interrupted by
    /// cancellation has no outcome.
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks that completed with a 200.
    pub succeeded: usize,
    /// Tasks finalized as permanent failures.
    pub failed: usize,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

impl DispatchReport {
    /// Average latency of successful tasks per country, fastest first.
    pub fn latency_by_country(&self) -> Vec<GeoLatency> {
        self.latency_by(|outcome| {
            if outcome.country.is_empty() {
                None
            } else {
                Some(outcome.country.clone())
            }
        })
    }

    /// Average latency of successful tasks per `country/city`, fastest
    /// first.
    pub fn latency_by_city(&self) -> Vec<GeoLatency> {
        self.latency_by(|outcome| {
            if outcome.city.is_empty() {
                None
            } else {
                Some(format!("{}/{}", outcome.country, outcome.city))
            }
        })
    }

    fn latency_by(&self, key_of: impl Fn(&TaskOutcome) -> Option<String>) -> Vec<GeoLatency> {
        let mut buckets: HashMap<String, Vec<Duration>> = HashMap::new();
        for outcome in self.outcomes.iter().filter(|o| o.success) {
            if let Some(key) = key_of(outcome) {
                buckets.entry(key).or_default().push(outcome.duration);
            }
        }

        let mut latencies: Vec<GeoLatency> = buckets
            .into_iter()
            .map(|(key, durations)| {
                let total: Duration = durations.iter().sum();
                GeoLatency {
                    key,
                    average: total / durations.len() as u32,
                    count: durations.len(),
                }
            })
            .collect();
        latencies.sort_by_key(|entry| entry.average);
        latencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(country: &str, city: &str, millis: u64, success: bool) -> TaskOutcome {
        TaskOutcome {
            task_id: 0,
            ip: "1.1.1.1".into(),
            status: success.then_some(200),
            success,
            error: None,
            duration: Duration::from_millis(millis),
            attempts: 1,
            country: country.into(),
            city: city.into(),
        }
    }

    #[test]
    fn test_latency_by_country_sorted_fastest_first() {
        let report = DispatchReport {
            outcomes: vec![
                outcome("Japan", "Tokyo", 80, true),
                outcome("Japan", "Tokyo", 120, true),
                outcome("United States", "Los Angeles", 40, true),
                outcome("Germany", "Berlin", 500, false), // failures excluded
                outcome("", "", 10, true),                // unknown geo excluded
            ],
            succeeded: 4,
            failed: 1,
            elapsed: Duration::from_secs(1),
        };

        let by_country = report.latency_by_country();
        assert_eq!(by_country.len(), 2);
        assert_eq!(by_country[0].key, "United States");
        assert_eq!(by_country[0].count, 1);
        assert_eq!(by_country[1].key, "Japan");
        assert_eq!(by_country[1].average, Duration::from_millis(100));
        assert_eq!(by_country[1].count, 2);
    }

    #[test]
    fn test_latency_by_city_keys() {
        let report = DispatchReport {
            outcomes: vec![outcome("Japan", "Tokyo", 90, true)],
            succeeded: 1,
            failed: 0,
            elapsed: Duration::from_secs(1),
        };
        let by_city = report.latency_by_city();
        assert_eq!(by_city.len(), 1);
        assert_eq!(by_city[0].key, "Japan/Tokyo");
    }
}
