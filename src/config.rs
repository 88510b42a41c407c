// Tue Jan 13 2026 - Alex

use crate::memory::RegionFilter;
use crate::pattern::scanner::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Regions larger than this are not scanned. `None` scans everything.
    /// Enforced by the reader through [`region_filter`](Self::region_filter).
    pub max_region_size: Option<usize>,
    /// Bytes copied out of the target per read while scanning a region.
    pub chunk_size: usize,
    pub parallel_batch: bool,
    pub worker_name: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_region_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel_batch: true,
            worker_name: "background-scan".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_region_size(mut self, size: usize) -> Self {
        self.max_region_size = Some(size);
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_parallel_batch(mut self, parallel: bool) -> Self {
        self.parallel_batch = parallel;
        self
    }

    pub fn with_worker_name(mut self, name: &str) -> Self {
        self.worker_name = name.to_string();
        self
    }

    pub fn region_filter(&self) -> RegionFilter {
        RegionFilter { max_size: self.max_region_size }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_region_size == Some(0) {
            return Err(ConfigError::Validation("max_region_size must be greater than 0".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Validation("chunk_size must be greater than 0".to_string()));
        }
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Validation("worker_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("procmem-config-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.region_filter(), RegionFilter::default());
    }

    #[test]
    fn test_validation_rejects_zero_cap() {
        let config = ScanConfig::new().with_max_region_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_zero_chunk() {
        let config = ScanConfig::new().with_chunk_size(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        assert!(ScanConfig::new().with_chunk_size(4096).validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let config = ScanConfig::new()
            .with_max_region_size(0x100000)
            .with_chunk_size(0x8000)
            .with_parallel_batch(false)
            .with_worker_name("scanner");
        config.save(&path).unwrap();

        let loaded = ScanConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "parallel_batch": false }"#).unwrap();

        let loaded = ScanConfig::load(&path).unwrap();
        assert!(!loaded.parallel_batch);
        assert_eq!(loaded.max_region_size, None);
        assert_eq!(loaded.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(loaded.worker_name, "background-scan");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let path = temp_path("missing");
        assert!(matches!(ScanConfig::load(&path), Err(ConfigError::NotFound(_))));
        assert_eq!(ScanConfig::load_or_default(&path), ScanConfig::default());
    }
}
