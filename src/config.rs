//! Configuration management for opsroute
//!
//! Parses TOML configuration files and provides typed access to settings.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for every timeout in the file (seconds)
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub decision_log: DecisionLogConfig,
    #[serde(default)]
    pub recommended: RecommendedConfig,
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Background health probing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    /// Seconds between scheduled probes of the same provider
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Hard upper bound for a single probe
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
    /// Consecutive failures after which a provider is unhealthy
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,
    /// Probe latency above which a provider is considered degraded
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
            unhealthy_threshold: default_unhealthy_threshold(),
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_probe_timeout_seconds() -> u64 {
    5
}

fn default_unhealthy_threshold() -> u32 {
    3
}

fn default_slow_threshold_ms() -> u64 {
    2000
}

/// Orchestration execution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestrationConfig {
    /// Hard upper bound for one provider invocation
    #[serde(default = "default_orchestration_timeout")]
    pub timeout_seconds: u64,
}

impl OrchestrationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_orchestration_timeout(),
        }
    }
}

fn default_orchestration_timeout() -> u64 {
    10
}

/// Decision log settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionLogConfig {
    /// Maximum number of retained decisions (oldest evicted first)
    #[serde(default = "default_decision_log_capacity")]
    pub capacity: usize,
}

impl Default for DecisionLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_decision_log_capacity(),
        }
    }
}

fn default_decision_log_capacity() -> usize {
    500
}

/// A provider/model pairing shown to operators as a recommendation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelPairing {
    pub provider: String,
    pub model: String,
}

/// Recommended pairings for local and cloud deployments
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecommendedConfig {
    #[serde(default)]
    pub local: Option<ModelPairing>,
    #[serde(default)]
    pub cloud: Option<ModelPairing>,
}

/// Which client implementation backs a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    Openai,
    Anthropic,
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }

    /// Where this kind of provider normally runs
    pub fn default_category(&self) -> ProviderCategory {
        match self {
            Self::Ollama | Self::Mock => ProviderCategory::Local,
            Self::Openai | Self::Anthropic => ProviderCategory::Cloud,
        }
    }

    fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => Some("http://localhost:11434"),
            Self::Openai => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com/v1"),
            Self::Mock => None,
        }
    }

    fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Openai => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama | Self::Mock => None,
        }
    }
}

/// Local (self-hosted) or cloud provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCategory {
    Local,
    Cloud,
}

/// Individual provider configuration
///
/// All fields are private to enforce invariants. Configuration is loaded via
/// deserialization and validated via Config::validate().
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    name: String,
    kind: ProviderKind,
    #[serde(default)]
    category: Option<ProviderCategory>,
    #[serde(default)]
    base_url: Option<String>,
    models: Vec<String>,
    #[serde(default)]
    default_model: Option<String>,
    #[serde(default)]
    api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

impl ProviderConfig {
    /// Get the provider name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the client kind
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Get the category, falling back to the kind's usual category
    pub fn category(&self) -> ProviderCategory {
        self.category.unwrap_or_else(|| self.kind.default_category())
    }

    /// Get the base URL, falling back to the kind's public default
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .or_else(|| self.kind.default_base_url())
    }

    /// Supported model identifiers in declaration order
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Model selected at start-up (first declared model unless overridden)
    pub fn default_model(&self) -> &str {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
            .unwrap_or_default()
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&str> {
        self.api_key_env
            .as_deref()
            .or_else(|| self.kind.default_api_key_env())
    }

    /// Default sampling temperature
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Default generation limit
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Find a provider by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but can also
    /// be called explicitly when constructing Config via other means.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        // ═══════════════════════════════════════════════════════════════════════
        // Phase 1: Provider field validation
        // ═══════════════════════════════════════════════════════════════════════
        if self.providers.is_empty() {
            return Err(AppError::Config(
                "Configuration error: no providers configured. \
                At least one [[providers]] entry is required.\n\n\
                Example fix - add to config.toml:\n\
                [[providers]]\n\
                name = \"mock\"\n\
                kind = \"mock\"\n\
                models = [\"mock-agent\"]"
                    .to_string(),
            ));
        }

        let mut seen_names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(AppError::Config(
                    "Configuration error: provider name cannot be empty".to_string(),
                ));
            }

            if !seen_names.insert(provider.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Configuration error: provider '{}' is declared more than once. \
                    Provider names must be unique.",
                    provider.name
                )));
            }

            if provider.models.is_empty() {
                return Err(AppError::Config(format!(
                    "Configuration error: provider '{}' has no models. \
                    List at least one model id in `models`.",
                    provider.name
                )));
            }

            let mut seen_models = HashSet::new();
            for model in &provider.models {
                if model.trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "Configuration error: provider '{}' lists an empty model id",
                        provider.name
                    )));
                }
                if !seen_models.insert(model.as_str()) {
                    return Err(AppError::Config(format!(
                        "Configuration error: provider '{}' lists model '{}' more than once",
                        provider.name, model
                    )));
                }
            }

            if let Some(default_model) = &provider.default_model {
                if !provider.models.contains(default_model) {
                    return Err(AppError::Config(format!(
                        "Configuration error: provider '{}' has default_model '{}' \
                        which is not in its models list ({}).",
                        provider.name,
                        default_model,
                        provider.models.join(", ")
                    )));
                }
            }

            // Validate base_url: must start with http:// or https://
            if let Some(base_url) = provider.base_url() {
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(AppError::Config(format!(
                        "Configuration error: provider '{}' has invalid base_url '{}'. \
                        base_url must start with 'http://' or 'https://'.",
                        provider.name, base_url
                    )));
                }

                // Probe and invocation paths are appended with a leading slash
                if base_url.ends_with('/') {
                    return Err(AppError::Config(format!(
                        "Configuration error: provider '{}' has base_url '{}' with a trailing slash. \
                        Remove the trailing '/'.",
                        provider.name, base_url
                    )));
                }
            }

            if let Err(reason) = validate_sampling(provider.temperature, provider.max_tokens) {
                return Err(AppError::Config(format!(
                    "Configuration error: provider '{}': {}",
                    provider.name, reason
                )));
            }
        }

        // ═══════════════════════════════════════════════════════════════════════
        // Phase 2: Recommended pairings must reference declared providers/models
        // ═══════════════════════════════════════════════════════════════════════
        for (slot, pairing) in [
            ("local", &self.recommended.local),
            ("cloud", &self.recommended.cloud),
        ] {
            let Some(pairing) = pairing else {
                continue;
            };

            let Some(provider) = self.provider(&pairing.provider) else {
                return Err(AppError::Config(format!(
                    "Configuration error: recommended.{} references unknown provider '{}'",
                    slot, pairing.provider
                )));
            };

            if !provider.models.contains(&pairing.model) {
                return Err(AppError::Config(format!(
                    "Configuration error: recommended.{} model '{}' is not supported by provider '{}'",
                    slot, pairing.model, pairing.provider
                )));
            }
        }

        // ═══════════════════════════════════════════════════════════════════════
        // Phase 3: Timing
        // ═══════════════════════════════════════════════════════════════════════
        for (field, value) in [
            ("health.interval_seconds", self.health.interval_seconds),
            ("health.probe_timeout_seconds", self.health.probe_timeout_seconds),
            ("orchestration.timeout_seconds", self.orchestration.timeout_seconds),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!(
                    "Configuration error: {} must be greater than 0",
                    field
                )));
            }
            if value > MAX_TIMEOUT_SECONDS {
                return Err(AppError::Config(format!(
                    "Configuration error: {} cannot exceed {} seconds, got {}",
                    field, MAX_TIMEOUT_SECONDS, value
                )));
            }
        }

        // A probe that may outlive its interval would overlap with the next tick
        if self.health.probe_timeout_seconds >= self.health.interval_seconds {
            return Err(AppError::Config(format!(
                "Configuration error: health.probe_timeout_seconds ({}) must be less than \
                health.interval_seconds ({})",
                self.health.probe_timeout_seconds, self.health.interval_seconds
            )));
        }

        if self.health.unhealthy_threshold == 0 {
            return Err(AppError::Config(
                "Configuration error: health.unhealthy_threshold must be at least 1".to_string(),
            ));
        }

        if self.decision_log.capacity == 0 {
            return Err(AppError::Config(
                "Configuration error: decision_log.capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Shared bounds for temperature and max_tokens (config file and runtime options)
pub(crate) fn validate_sampling(temperature: f64, max_tokens: u32) -> Result<(), String> {
    if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
        return Err(format!(
            "temperature must be a finite number between 0.0 and 2.0, got {}",
            temperature
        ));
    }
    if max_tokens == 0 {
        return Err("max_tokens must be greater than 0".to_string());
    }
    Ok(())
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
