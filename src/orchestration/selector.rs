//! Provider selection
//!
//! Pure functions over a [`HealthSnapshot`]; no I/O and no locking. The
//! snapshot carries providers in registry order, which is the final tiebreak.
//!
//! Ranking without an override:
//! 1. `healthy` before `degraded` (`unhealthy` and `unknown` are never picked)
//! 2. lower observed latency first, providers without a latency last
//! 3. registry declaration order

use crate::error::{RouterError, RouterResult};
use crate::health::{HealthSnapshot, HealthStatus};
use crate::orchestration::OrchestrationRequest;
use crate::providers::{ExclusionSet, ProviderName};

/// Choose the provider for `request`
///
/// An override that is not excluded is honoured unless its provider is
/// unhealthy; `unknown` and `degraded` overrides are used as requested.
///
/// # Errors
/// - `UnknownProvider` for an override naming no registered provider
/// - `ProviderUnavailable` for an unhealthy override
/// - `NoHealthyProvider` when nothing is eligible
pub fn select(
    request: &OrchestrationRequest,
    snapshot: &HealthSnapshot,
    exclude: &ExclusionSet,
) -> RouterResult<ProviderName> {
    if let Some(name) = request.provider() {
        let name = ProviderName::from(name);
        if !exclude.contains(&name) {
            return select_override(name, snapshot);
        }
        tracing::debug!(
            provider = %name,
            "Override already excluded for this request, ranking remaining providers"
        );
    }

    ranked(snapshot, exclude)
        .into_iter()
        .next()
        .ok_or_else(|| {
            tracing::warn!(
                checked = snapshot.len(),
                excluded = exclude.len(),
                "No healthy provider available"
            );
            RouterError::NoHealthyProvider {
                checked: snapshot.len(),
                excluded: exclude.len(),
            }
        })
}

fn select_override(name: ProviderName, snapshot: &HealthSnapshot) -> RouterResult<ProviderName> {
    match snapshot.status(name.as_str()) {
        None => Err(RouterError::UnknownProvider {
            name: name.to_string(),
            available: snapshot.names().collect::<Vec<_>>().join(", "),
        }),
        Some(HealthStatus::Unhealthy) => {
            tracing::warn!(provider = %name, "Requested provider is unhealthy");
            Err(RouterError::ProviderUnavailable {
                name: name.to_string(),
            })
        }
        Some(status) => {
            tracing::debug!(provider = %name, status = %status, "Using requested provider");
            Ok(name)
        }
    }
}

/// Every eligible provider, best first
pub fn ranked(snapshot: &HealthSnapshot, exclude: &ExclusionSet) -> Vec<ProviderName> {
    let mut candidates: Vec<(u8, u64, usize, &str)> = snapshot
        .iter()
        .enumerate()
        .filter_map(|(position, (name, record))| {
            let tier = match record.status() {
                HealthStatus::Healthy => 0,
                HealthStatus::Degraded => 1,
                HealthStatus::Unhealthy | HealthStatus::Unknown => return None,
            };
            if exclude.contains(&ProviderName::from(name)) {
                return None;
            }
            let latency = record.latency_ms().unwrap_or(u64::MAX);
            Some((tier, latency, position, name))
        })
        .collect();

    // Keys are unique per provider (position), so an unstable sort is deterministic
    candidates.sort_unstable();
    candidates
        .into_iter()
        .map(|(_, _, _, name)| ProviderName::from(name))
        .collect()
}
