//! Manager configuration.

use serde::{Deserialize, Serialize};

/// What the registry does when an identifier is registered by a second entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The newcomer takes the identifier; the previous holder is evicted.
    #[default]
    Replace,
    /// The registration fails with [`RegistryError::DuplicateId`](crate::RegistryError::DuplicateId).
    Reject,
}

/// Configuration for a [`DragDropManager`](crate::DragDropManager).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Duplicate identifier handling in the registry.
    pub duplicate_policy: DuplicatePolicy,
}

impl ManagerConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the duplicate identifier policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_replaces_duplicates() {
        assert_eq!(ManagerConfig::new().duplicate_policy, DuplicatePolicy::Replace);
    }

    #[test]
    fn test_config_from_json() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{ "duplicate_policy": "reject" }"#).unwrap();
        assert_eq!(
            config,
            ManagerConfig::new().with_duplicate_policy(DuplicatePolicy::Reject)
        );

        let empty: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ManagerConfig::default());
    }
}
