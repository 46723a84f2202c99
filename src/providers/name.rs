//! Type-safe provider name wrapper
//!
//! Used for selection results and for the per-request exclusion set that keeps
//! a fallback attempt away from the provider that just failed.

use std::collections::HashSet;
use std::fmt;

/// Type-safe wrapper for provider names
///
/// Construction does not validate; unknown names surface as
/// `RouterError::UnknownProvider` when used with registry lookups.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ProviderName(String);

impl ProviderName {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProviderName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ProviderName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl PartialEq<str> for ProviderName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProviderName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Providers that must not be selected again within one orchestration
pub type ExclusionSet = HashSet<ProviderName>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_compares_with_str() {
        let name = ProviderName::from("ollama");
        assert_eq!(name, "ollama");
        assert_eq!(name.as_str(), "ollama");
        assert_eq!(name.to_string(), "ollama");
    }

    #[test]
    fn test_exclusion_set_deduplicates() {
        let mut excluded = ExclusionSet::new();
        excluded.insert(ProviderName::from("ollama"));
        excluded.insert(ProviderName::from("ollama".to_string()));
        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains(&ProviderName::from("ollama")));
    }
}
