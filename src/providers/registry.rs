//! Provider registry
//!
//! Catalog of known providers in declaration order, together with each
//! provider's active settings. Settings change only through [`ProviderRegistry::configure`];
//! providers are never removed at runtime.

use crate::config::{
    Config, ProviderCategory, ProviderConfig, ProviderKind, RecommendedConfig, validate_sampling,
};
use crate::error::{AppError, AppResult, RouterError, RouterResult};
use crate::providers::{self, Provider};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Static description of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub category: ProviderCategory,
    /// Supported model ids in declaration order
    pub models: Vec<String>,
}

/// Active configuration read by every invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Optional overrides accepted by `configure`; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One registered provider
pub struct RegistryEntry {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn Provider>,
    settings: RwLock<ProviderSettings>,
}

impl RegistryEntry {
    /// Create an entry from explicit parts
    pub fn new(
        descriptor: ProviderDescriptor,
        settings: ProviderSettings,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            descriptor,
            provider,
            settings: RwLock::new(settings),
        }
    }

    /// Create an entry whose descriptor and initial settings come from configuration
    pub fn from_config(config: &ProviderConfig, provider: Arc<dyn Provider>) -> Self {
        Self::new(
            ProviderDescriptor {
                name: config.name().to_string(),
                kind: config.kind(),
                category: config.category(),
                models: config.models().to_vec(),
            },
            ProviderSettings {
                model: config.default_model().to_string(),
                temperature: config.temperature(),
                max_tokens: config.max_tokens(),
            },
            provider,
        )
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.provider.clone()
    }

    /// Copy of the current settings
    pub fn settings(&self) -> ProviderSettings {
        self.settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Process-wide catalog of providers, owned by the router façade
pub struct ProviderRegistry {
    entries: Vec<RegistryEntry>,
    recommended: RecommendedConfig,
}

impl ProviderRegistry {
    /// Create a registry from explicit entries
    ///
    /// # Errors
    /// Returns an error if the list is empty or a name is registered twice.
    pub fn new(entries: Vec<RegistryEntry>, recommended: RecommendedConfig) -> AppResult<Self> {
        if entries.is_empty() {
            return Err(AppError::Config(
                "provider registry requires at least one provider".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name().to_string()) {
                return Err(AppError::Config(format!(
                    "provider '{}' is registered more than once",
                    entry.name()
                )));
            }
        }

        tracing::info!(
            total_providers = entries.len(),
            providers = ?entries.iter().map(|e| e.name()).collect::<Vec<_>>(),
            "Provider registry initialized"
        );

        Ok(Self {
            entries,
            recommended,
        })
    }

    /// Build every configured provider client
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let entries = config
            .providers
            .iter()
            .map(|provider_config| {
                RegistryEntry::from_config(
                    provider_config,
                    providers::build(provider_config, http.clone()),
                )
            })
            .collect();

        Self::new(entries, config.recommended.clone())
    }

    /// All entries in declaration order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Provider names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors of every provider in declaration order
    pub fn list_providers(&self) -> Vec<ProviderDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Supported model ids for `name`, in declaration order
    pub fn models_for(&self, name: &str) -> RouterResult<Vec<String>> {
        Ok(self.lookup(name)?.descriptor.models.clone())
    }

    /// Current settings for `name`
    pub fn settings(&self, name: &str) -> RouterResult<ProviderSettings> {
        Ok(self.lookup(name)?.settings())
    }

    /// Client and current settings for one invocation
    pub fn resolve(&self, name: &str) -> RouterResult<(Arc<dyn Provider>, ProviderSettings)> {
        let entry = self.lookup(name)?;
        Ok((entry.provider(), entry.settings()))
    }

    /// Recommended local/cloud pairings from configuration
    pub fn recommended(&self) -> &RecommendedConfig {
        &self.recommended
    }

    /// Select `model` for provider `name`, optionally changing sampling options
    ///
    /// # Errors
    /// - `UnknownProvider` if `name` is not registered
    /// - `UnsupportedModel` if the provider does not list `model`
    /// - `InvalidOptions` if the resulting temperature or max_tokens is out of range
    pub fn configure(
        &self,
        name: &str,
        model: &str,
        options: &ProviderOptions,
    ) -> RouterResult<ProviderSettings> {
        let entry = self.lookup(name)?;

        if !entry.descriptor.models.iter().any(|m| m == model) {
            tracing::warn!(
                provider = %name,
                model = %model,
                "Rejected configuration: unsupported model"
            );
            return Err(RouterError::UnsupportedModel {
                provider: name.to_string(),
                model: model.to_string(),
                supported: entry.descriptor.models.join(", "),
            });
        }

        let mut settings = entry
            .settings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let updated = ProviderSettings {
            model: model.to_string(),
            temperature: options.temperature.unwrap_or(settings.temperature),
            max_tokens: options.max_tokens.unwrap_or(settings.max_tokens),
        };

        validate_sampling(updated.temperature, updated.max_tokens).map_err(|reason| {
            RouterError::InvalidOptions {
                provider: name.to_string(),
                reason,
            }
        })?;

        tracing::info!(
            provider = %name,
            previous_model = %settings.model,
            model = %updated.model,
            temperature = updated.temperature,
            max_tokens = updated.max_tokens,
            "Provider configuration updated"
        );

        *settings = updated.clone();
        Ok(updated)
    }

    fn entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    fn lookup(&self, name: &str) -> RouterResult<&RegistryEntry> {
        self.entry(name)
            .ok_or_else(|| RouterError::UnknownProvider {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use std::str::FromStr;

    fn create_test_registry() -> ProviderRegistry {
        let config = Config::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 8090

[[providers]]
name = "ollama"
kind = "mock"
category = "local"
models = ["llama2-7b", "mistral-7b"]
default_model = "mistral-7b"

[[providers]]
name = "mock"
kind = "mock"
models = ["mock-agent"]
"#,
        )
        .expect("should parse test config");

        let entries = config
            .providers
            .iter()
            .map(|p| RegistryEntry::from_config(p, Arc::new(MockProvider::new(p.name()))))
            .collect();
        ProviderRegistry::new(entries, RecommendedConfig::default()).expect("valid registry")
    }

    #[test]
    fn test_registry_preserves_declaration_order() {
        let registry = create_test_registry();
        assert_eq!(registry.names(), vec!["ollama", "mock"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("mock"));
        assert!(!registry.contains("openai"));
    }

    #[test]
    fn test_models_for_returns_declared_order() {
        let registry = create_test_registry();
        assert_eq!(
            registry.models_for("ollama").unwrap(),
            vec!["llama2-7b".to_string(), "mistral-7b".to_string()]
        );
    }

    #[test]
    fn test_models_for_unknown_provider_fails() {
        let registry = create_test_registry();
        let err = registry.models_for("openai").unwrap_err();
        assert!(matches!(err, RouterError::UnknownProvider { ref name, .. } if name == "openai"));
        assert!(err.to_string().contains("ollama, mock"));
    }

    #[test]
    fn test_initial_settings_use_default_model() {
        let registry = create_test_registry();
        let settings = registry.settings("ollama").unwrap();
        assert_eq!(settings.model, "mistral-7b");
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.max_tokens, 1024);
    }

    #[test]
    fn test_configure_updates_active_model() {
        let registry = create_test_registry();
        let updated = registry
            .configure("ollama", "llama2-7b", &ProviderOptions::default())
            .expect("should configure");
        assert_eq!(updated.model, "llama2-7b");
        assert_eq!(registry.settings("ollama").unwrap().model, "llama2-7b");
    }

    #[test]
    fn test_configure_applies_options_and_keeps_unset_fields() {
        let registry = create_test_registry();
        let options = ProviderOptions {
            temperature: Some(0.1),
            max_tokens: None,
        };
        let updated = registry.configure("ollama", "llama2-7b", &options).unwrap();
        assert_eq!(updated.temperature, 0.1);
        assert_eq!(updated.max_tokens, 1024);
    }

    #[test]
    fn test_configure_unknown_provider_fails() {
        let registry = create_test_registry();
        let err = registry
            .configure("openai", "gpt-4", &ProviderOptions::default())
            .unwrap_err();
        assert!(matches!(err, RouterError::UnknownProvider { .. }));
    }

    #[test]
    fn test_configure_unsupported_model_leaves_settings_untouched() {
        let registry = create_test_registry();
        let err = registry
            .configure("ollama", "gpt-4", &ProviderOptions::default())
            .unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedModel { ref model, .. } if model == "gpt-4"));
        assert_eq!(registry.settings("ollama").unwrap().model, "mistral-7b");
    }

    #[test]
    fn test_configure_invalid_options_rejected() {
        let registry = create_test_registry();
        let options = ProviderOptions {
            temperature: Some(f64::NAN),
            max_tokens: None,
        };
        let err = registry.configure("ollama", "llama2-7b", &options).unwrap_err();
        assert!(matches!(err, RouterError::InvalidOptions { .. }));
        assert_eq!(registry.settings("ollama").unwrap().model, "mistral-7b");

        let options = ProviderOptions {
            temperature: None,
            max_tokens: Some(0),
        };
        let err = registry.configure("ollama", "llama2-7b", &options).unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let settings = ProviderSettings {
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 16,
        };
        let descriptor = ProviderDescriptor {
            name: "dup".to_string(),
            kind: ProviderKind::Mock,
            category: ProviderCategory::Local,
            models: vec!["m".to_string()],
        };
        let entries = vec![
            RegistryEntry::new(
                descriptor.clone(),
                settings.clone(),
                Arc::new(MockProvider::new("dup")),
            ),
            RegistryEntry::new(descriptor, settings, Arc::new(MockProvider::new("dup"))),
        ];
        let result = ProviderRegistry::new(entries, RecommendedConfig::default());
        assert!(result.is_err());
    }
}
