//! Per-provider health state and classification

use crate::config::HealthConfig;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tokio::time::Instant;

/// Observed availability of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds that turn probe history into a [`HealthStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Consecutive failures at which a provider becomes unhealthy
    pub unhealthy_threshold: u32,
    /// Latency above which a responsive provider is degraded
    pub slow_threshold_ms: u64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            unhealthy_threshold: 3,
            slow_threshold_ms: 2000,
        }
    }
}

impl From<&HealthConfig> for HealthPolicy {
    fn from(config: &HealthConfig) -> Self {
        Self {
            unhealthy_threshold: config.unhealthy_threshold,
            slow_threshold_ms: config.slow_threshold_ms,
        }
    }
}

impl HealthPolicy {
    /// Classify a provider from its probe history
    pub fn classify(
        &self,
        probes_completed: u64,
        consecutive_failures: u32,
        latency_ms: Option<u64>,
    ) -> HealthStatus {
        if probes_completed == 0 {
            HealthStatus::Unknown
        } else if consecutive_failures >= self.unhealthy_threshold {
            HealthStatus::Unhealthy
        } else if consecutive_failures > 0
            || latency_ms.is_some_and(|ms| ms > self.slow_threshold_ms)
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Health of one provider
///
/// Only the provider's health worker mutates a record; everyone else sees
/// copies published through the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    status: HealthStatus,
    latency_ms: Option<u64>,
    error_count: u64,
    consecutive_failures: u32,
    message: String,
    /// Seconds since the last completed probe, computed when a snapshot is taken
    last_check_ago: Option<u64>,
    #[serde(skip)]
    last_check: Option<Instant>,
    #[serde(skip)]
    probes_completed: u64,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRecord {
    /// Record for a provider that has not been probed yet
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Unknown,
            latency_ms: None,
            error_count: 0,
            consecutive_failures: 0,
            message: "Not checked yet".to_string(),
            last_check_ago: None,
            last_check: None,
            probes_completed: 0,
        }
    }

    /// Record with a given status, e.g. when presenting data that did not come
    /// from a local probe
    pub fn with_status(status: HealthStatus, latency_ms: Option<u64>) -> Self {
        let probes_completed = u64::from(status != HealthStatus::Unknown);
        Self {
            status,
            latency_ms,
            message: match status {
                HealthStatus::Unknown => "Not checked yet".to_string(),
                _ => "OK".to_string(),
            },
            last_check_ago: (probes_completed > 0).then_some(0),
            probes_completed,
            ..Self::new()
        }
    }

    /// Apply a successful probe
    pub fn record_success(&mut self, latency_ms: u64, now: Instant, policy: &HealthPolicy) {
        self.latency_ms = Some(latency_ms);
        self.consecutive_failures = 0;
        self.message = "OK".to_string();
        self.complete_probe(now, policy);
    }

    /// Apply a failed probe; the last observed latency is kept
    pub fn record_failure(&mut self, reason: impl Into<String>, now: Instant, policy: &HealthPolicy) {
        self.error_count = self.error_count.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.message = reason.into();
        self.complete_probe(now, policy);
    }

    fn complete_probe(&mut self, now: Instant, policy: &HealthPolicy) {
        self.probes_completed = self.probes_completed.saturating_add(1);
        self.last_check = Some(now);
        self.last_check_ago = Some(0);
        self.status = policy.classify(
            self.probes_completed,
            self.consecutive_failures,
            self.latency_ms,
        );
    }

    /// Copy with `last_check_ago` measured against `now`
    pub fn aged(&self, now: Instant) -> Self {
        let mut record = self.clone();
        if let Some(last_check) = self.last_check {
            record.last_check_ago = Some(now.saturating_duration_since(last_check).as_secs());
        }
        record
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn last_check_ago(&self) -> Option<u64> {
        self.last_check_ago
    }

    pub fn probes_completed(&self) -> u64 {
        self.probes_completed
    }
}

/// Point-in-time view of every provider's health, in registry order
///
/// Serializes as a JSON object keyed by provider name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSnapshot {
    entries: Vec<(String, HealthRecord)>,
}

impl HealthSnapshot {
    pub fn get(&self, name: &str) -> Option<&HealthRecord> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, record)| record)
    }

    /// Status of `name`, `None` if the provider is not in the snapshot
    pub fn status(&self, name: &str) -> Option<HealthStatus> {
        self.get(name).map(HealthRecord::status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HealthRecord)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, HealthRecord)> for HealthSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, HealthRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for HealthSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HealthSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = HealthSnapshot;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of provider name to health record")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, record)) = access.next_entry::<String, HealthRecord>()? {
                    entries.push((name, record));
                }
                Ok(HealthSnapshot { entries })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}
