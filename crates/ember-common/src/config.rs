//! Configuration structures for emberdb.

use crate::error::{EmberError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest fanout a B-tree index accepts.
pub const MIN_ORDER: usize = 3;

/// B-tree index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum number of children an internal node may have.
    pub order: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { order: 4 }
    }
}

impl IndexConfig {
    /// Creates an index configuration with the given fanout.
    pub fn with_order(order: usize) -> Self {
        Self { order }
    }

    /// Rejects fanouts below `MIN_ORDER`.
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER {
            return Err(EmberError::ConfigError(format!(
                "order must be at least {}, got {}",
                MIN_ORDER, self.order
            )));
        }
        Ok(())
    }
}

/// Storage configuration for the paged storage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the database file.
    pub data_dir: PathBuf,
    /// Name of the database file inside `data_dir`.
    pub file_name: String,
    /// Buffer pool size in number of pages.
    pub cache_pages: usize,
    /// Enable fsync on flush.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_name: "database.db".to_string(),
            cache_pages: 64, // 256 KB with 4 KB pages
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Full path of the database file.
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    /// Returns the total buffer pool size in bytes.
    pub fn cache_size_bytes(&self) -> usize {
        self.cache_pages * crate::page::PAGE_SIZE
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_pages == 0 {
            return Err(EmberError::InvalidParameter {
                name: "cache_pages".to_string(),
                value: self.cache_pages.to_string(),
            });
        }
        if self.file_name.is_empty() {
            return Err(EmberError::InvalidParameter {
                name: "file_name".to_string(),
                value: String::new(),
            });
        }
        Ok(())
    }
}

/// Bytecode interpreter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfig {
    /// Number of general-purpose registers.
    pub max_registers: usize,
    /// Maximum depth of the value stack (shared by CALL and PUSH).
    pub max_stack: usize,
    /// Maximum number of instructions in a loaded program.
    pub max_program: usize,
    /// Abort after this many executed instructions (None = unbounded).
    pub step_limit: Option<u64>,
    /// Configuration of the interpreter's integer-keyed index.
    pub index: IndexConfig,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_registers: 256,
            max_stack: 1024,
            max_program: 1024,
            step_limit: None,
            index: IndexConfig::default(),
        }
    }
}

impl VmConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_registers", self.max_registers),
            ("max_stack", self.max_stack),
            ("max_program", self.max_program),
        ] {
            if value == 0 {
                return Err(EmberError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        self.index.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.order, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_config_rejects_small_order() {
        for order in 0..MIN_ORDER {
            let err = IndexConfig::with_order(order).validate().unwrap_err();
            assert!(matches!(err, EmberError::ConfigError(_)));
        }
        assert!(IndexConfig::with_order(3).validate().is_ok());
        assert!(IndexConfig::with_order(128).validate().is_ok());
    }

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.file_name, "database.db");
        assert_eq!(config.cache_pages, 64);
        assert!(config.fsync_enabled);
        assert_eq!(config.file_path(), PathBuf::from("./data/database.db"));
        assert_eq!(config.cache_size_bytes(), 64 * 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_config_validate() {
        let config = StorageConfig {
            cache_pages: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EmberError::InvalidParameter { .. })
        ));

        let config = StorageConfig {
            file_name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_config_serde_roundtrip() {
        let original = StorageConfig {
            data_dir: PathBuf::from("/var/lib/emberdb"),
            file_name: "ember.db".to_string(),
            cache_pages: 16,
            fsync_enabled: false,
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: StorageConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.data_dir, deserialized.data_dir);
        assert_eq!(original.file_name, deserialized.file_name);
        assert_eq!(original.cache_pages, deserialized.cache_pages);
        assert_eq!(original.fsync_enabled, deserialized.fsync_enabled);
    }

    #[test]
    fn test_vm_config_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.max_registers, 256);
        assert_eq!(config.max_stack, 1024);
        assert_eq!(config.max_program, 1024);
        assert!(config.step_limit.is_none());
        assert_eq!(config.index, IndexConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vm_config_validate() {
        let config = VmConfig {
            max_stack: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter: max_stack = 0");

        let config = VmConfig {
            index: IndexConfig::with_order(2),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EmberError::ConfigError(_))));
    }

    #[test]
    fn test_vm_config_serde_roundtrip() {
        let original = VmConfig {
            step_limit: Some(10_000),
            index: IndexConfig::with_order(8),
            ..Default::default()
        };
        let json = serde_json::to_string(&original).unwrap();
        let restored: VmConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.step_limit, Some(10_000));
        assert_eq!(restored.index.order, 8);
        assert_eq!(restored.max_registers, original.max_registers);
    }
}
