//! Shared fixtures for integration tests
//!
//! `ScriptedProvider` is an in-process provider whose probe and invocation
//! behavior can be changed while a router is running.

#![allow(dead_code)]

use async_trait::async_trait;
use opsroute::config::{Config, ProviderCategory, ProviderKind, RecommendedConfig};
use opsroute::error::ProviderError;
use opsroute::orchestration::OrchestrationRequest;
use opsroute::providers::{
    Invocation, Provider, ProviderDescriptor, ProviderRegistry, ProviderSettings, RegistryEntry,
};
use opsroute::router::AgentRouter;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct ScriptedProvider {
    name: String,
    probe_failing: AtomicBool,
    probe_delay_ms: AtomicU64,
    probe_calls: AtomicUsize,
    invoke_failures_left: AtomicUsize,
    invoke_delay_ms: AtomicU64,
    invoke_calls: AtomicUsize,
    last_model: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            probe_failing: AtomicBool::new(false),
            probe_delay_ms: AtomicU64::new(0),
            probe_calls: AtomicUsize::new(0),
            invoke_failures_left: AtomicUsize::new(0),
            invoke_delay_ms: AtomicU64::new(0),
            invoke_calls: AtomicUsize::new(0),
            last_model: Mutex::new(None),
        })
    }

    /// Healthy provider whose probes take `latency_ms`
    pub fn with_latency(name: &str, latency_ms: u64) -> Arc<Self> {
        let provider = Self::new(name);
        provider.set_probe_delay(Duration::from_millis(latency_ms));
        provider
    }

    pub fn set_probe_failing(&self, failing: bool) {
        self.probe_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        self.probe_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// The next `count` invocations fail
    pub fn fail_next_invocations(&self, count: usize) {
        self.invoke_failures_left.store(count, Ordering::SeqCst);
    }

    pub fn set_invoke_delay(&self, delay: Duration) {
        self.invoke_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn invoke_calls(&self) -> usize {
        self.invoke_calls.load(Ordering::SeqCst)
    }

    pub fn last_model(&self) -> Option<String> {
        self.last_model.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn probe(&self) -> Result<(), ProviderError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.probe_failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Connection {
                provider: self.name.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn invoke(
        &self,
        request: &OrchestrationRequest,
        settings: &ProviderSettings,
    ) -> Result<Invocation, ProviderError> {
        self.invoke_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_model.lock().unwrap() = Some(settings.model.clone());

        let delay = self.invoke_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let should_fail = self
            .invoke_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ProviderError::Injected {
                provider: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }

        Ok(Invocation {
            decision: format!("{} handled {}", self.name, request.event_type()),
            confidence: 0.9,
            actions: vec!["acknowledge".to_string()],
        })
    }
}

/// Registry entry for a scripted provider with models `["<name>-small", "<name>-large"]`
pub fn entry(provider: &Arc<ScriptedProvider>) -> RegistryEntry {
    let small = format!("{}-small", provider.name);
    let large = format!("{}-large", provider.name);
    RegistryEntry::new(
        ProviderDescriptor {
            name: provider.name.clone(),
            kind: ProviderKind::Mock,
            category: ProviderCategory::Local,
            models: vec![small.clone(), large],
        },
        ProviderSettings {
            model: small,
            temperature: 0.7,
            max_tokens: 256,
        },
        provider.clone(),
    )
}

/// Router configuration with the given timing; its provider list is unused
pub fn config(interval_seconds: u64, probe_timeout_seconds: u64, timeout_seconds: u64) -> Config {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[health]
interval_seconds = {interval_seconds}
probe_timeout_seconds = {probe_timeout_seconds}

[orchestration]
timeout_seconds = {timeout_seconds}

[[providers]]
name = "unused"
kind = "mock"
models = ["mock-agent"]
"#
    )
    .parse()
    .expect("test config should be valid")
}

pub fn router_with_config(providers: &[Arc<ScriptedProvider>], config: &Config) -> AgentRouter {
    let registry = ProviderRegistry::new(
        providers.iter().map(entry).collect(),
        RecommendedConfig::default(),
    )
    .expect("registry should build");
    AgentRouter::new(registry, config).expect("router should start")
}

/// Router with a 30s probe interval, 5s probe timeout and 10s invocation timeout
pub fn router(providers: &[Arc<ScriptedProvider>]) -> AgentRouter {
    router_with_config(providers, &config(30, 5, 10))
}

pub fn incident() -> OrchestrationRequest {
    OrchestrationRequest::new("incident", serde_json::json!({"severity": "high"}))
        .expect("valid request")
}
