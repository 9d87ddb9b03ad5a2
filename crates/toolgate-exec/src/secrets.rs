//! Opaque credential lookup for downstream connections.
//!
//! Transports need credentials (API tokens, connection strings) when
//! dialing a server; the policy core never sees them. Values are
//! zeroized on drop and redacted from debug output.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use zeroize::Zeroizing;

/// A secret value, zeroized on drop.
pub struct SecretValue(Zeroizing<String>);

impl SecretValue {
    /// Wrap a plaintext value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Read the plaintext. Callers hold it only as long as needed.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Name -> value credential lookup.
pub trait SecretsProvider: Send + Sync {
    /// The secret stored under `name`, if any.
    fn get(&self, name: &str) -> Option<SecretValue>;
}

/// Provider with no secrets. The default for mock setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

impl SecretsProvider for NoSecrets {
    fn get(&self, _name: &str) -> Option<SecretValue> {
        None
    }
}

/// In-memory provider for tests and development.
///
/// A production deployment implements [`SecretsProvider`] over its
/// vault; this one just holds zeroizing strings.
#[derive(Default)]
pub struct MemorySecrets {
    values: RwLock<HashMap<String, Zeroizing<String>>>,
}

impl MemorySecrets {
    /// An empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret under `name`, replacing any previous value.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(name.into(), Zeroizing::new(value.into()));
        }
    }

    /// Remove the secret under `name`. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.values
            .write()
            .map(|mut values| values.remove(name).is_some())
            .unwrap_or(false)
    }
}

impl SecretsProvider for MemorySecrets {
    fn get(&self, name: &str) -> Option<SecretValue> {
        let values = self.values.read().ok()?;
        values
            .get(name)
            .map(|value| SecretValue::new(value.as_str()))
    }
}

impl fmt::Debug for MemorySecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.values.read().map(|v| v.len()).unwrap_or(0);
        f.debug_struct("MemorySecrets")
            .field("count", &count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let secrets = MemorySecrets::new();
        secrets.insert("GITHUB_TOKEN", "ghp_abc123");

        let value = secrets.get("GITHUB_TOKEN").unwrap();
        assert_eq!(value.expose(), "ghp_abc123");

        assert!(secrets.remove("GITHUB_TOKEN"));
        assert!(!secrets.remove("GITHUB_TOKEN"));
        assert!(secrets.get("GITHUB_TOKEN").is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let value = SecretValue::new("hunter2");
        assert!(!format!("{value:?}").contains("hunter2"));
    }

    #[test]
    fn test_no_secrets() {
        assert!(NoSecrets.get("ANYTHING").is_none());
    }
}
