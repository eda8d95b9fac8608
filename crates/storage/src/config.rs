//! Store configuration.

use crate::medium::{FileMedium, Medium, MemoryMedium};
use quiver_core::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Configuration of one record store.
pub struct StoreConfig {
    entity: String,
    medium: Box<dyn Medium>,
    auto_checkpoint: bool,
}

impl StoreConfig {
    /// Starts building a configuration for the given entity kind.
    pub fn builder(entity: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder {
            entity: entity.into(),
            medium: None,
            auto_checkpoint: false,
        }
    }

    /// Returns the entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns whether callers should checkpoint after every mutation.
    pub fn auto_checkpoint(&self) -> bool {
        self.auto_checkpoint
    }

    pub(crate) fn into_parts(self) -> (String, Box<dyn Medium>, bool) {
        (self.entity, self.medium, self.auto_checkpoint)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("entity", &self.entity)
            .field("medium", &self.medium.describe())
            .field("auto_checkpoint", &self.auto_checkpoint)
            .finish()
    }
}

/// Builder for `StoreConfig`.
pub struct StoreConfigBuilder {
    entity: String,
    medium: Option<Box<dyn Medium>>,
    auto_checkpoint: bool,
}

impl StoreConfigBuilder {
    /// Persists checkpoints to a file.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.medium = Some(Box::new(FileMedium::new(path)));
        self
    }

    /// Persists checkpoints to the given in-memory medium.
    pub fn memory(mut self, medium: MemoryMedium) -> Self {
        self.medium = Some(Box::new(medium));
        self
    }

    /// Persists checkpoints to a caller-supplied medium.
    pub fn medium(mut self, medium: impl Medium + 'static) -> Self {
        self.medium = Some(Box::new(medium));
        self
    }

    /// Checkpoint after every mutation made through a controller.
    pub fn auto_checkpoint(mut self, enabled: bool) -> Self {
        self.auto_checkpoint = enabled;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// The entity name must be non-empty and consist of ASCII letters, digits
    /// and underscores. Without an explicit medium a fresh `MemoryMedium` is
    /// used.
    pub fn build(self) -> Result<StoreConfig> {
        validate_entity_name(&self.entity)?;
        Ok(StoreConfig {
            entity: self.entity,
            medium: self
                .medium
                .unwrap_or_else(|| Box::new(MemoryMedium::new()) as Box<dyn Medium>),
            auto_checkpoint: self.auto_checkpoint,
        })
    }
}

fn validate_entity_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::contract_violation("entity name must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::contract_violation(format!(
            "invalid entity name `{}`: only ASCII letters, digits and `_` are allowed",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = StoreConfig::builder("Task").build().unwrap();
        assert_eq!(config.entity(), "Task");
        assert!(!config.auto_checkpoint());
        assert!(format!("{:?}", config).contains("memory"));
    }

    #[test]
    fn test_builder_file_medium() {
        let config = StoreConfig::builder("Task")
            .file("/tmp/quiver/tasks.json")
            .auto_checkpoint(true)
            .build()
            .unwrap();
        assert!(config.auto_checkpoint());
        assert!(format!("{:?}", config).contains("tasks.json"));
    }

    #[test]
    fn test_invalid_entity_names() {
        assert!(matches!(
            StoreConfig::builder("").build(),
            Err(Error::ContractViolation { .. })
        ));
        assert!(StoreConfig::builder("my task").build().is_err());
        assert!(StoreConfig::builder("Task_2").build().is_ok());
    }
}
