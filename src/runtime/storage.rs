//! Filesystem layout helpers and atomic write operations
//!
//! Manages the runtime directory (config.json and model.json) and ensures
//! atomic writes via temp files and renames.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::RuntimeConfig;
use super::error::{StorageError, StorageResult};
use super::model::Model;

/// Storage manager for runtime persistence
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Get the model file path
    pub fn model_path(&self) -> PathBuf {
        self.root.join("model.json")
    }

    /// Write data atomically to a file
    ///
    /// Creates a temporary file, writes the data, syncs, then renames
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp_path = path.with_extension("tmp");
        let failed = |detail: String| StorageError::AtomicWriteFailed {
            path: path.to_path_buf(),
            detail,
        };

        let mut file = File::create(&temp_path)
            .map_err(|e| failed(format!("create {:?}: {}", temp_path, e)))?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path)
            .map_err(|e| failed(format!("rename {:?}: {}", temp_path, e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let dir = OpenOptions::new().read(true).open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Read a file
    pub fn read_file(&self, path: &Path) -> StorageResult<Vec<u8>> {
        if !path.exists() {
            return Err(StorageError::PathNotFound(path.to_path_buf()));
        }
        Ok(fs::read(path)?)
    }
}

/// Initialize the runtime directory
pub fn init_storage(root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("Failed to create directory: {:?}", root))
}

/// Write runtime configuration
pub fn write_config(config: &RuntimeConfig) -> Result<()> {
    let storage = Storage::new(config.root.clone());
    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    storage.write_atomic(&storage.config_path(), &json)?;
    Ok(())
}

/// Load runtime configuration
pub fn load_config(root: &Path) -> Result<RuntimeConfig> {
    let storage = Storage::new(root.to_path_buf());
    let data = storage.read_file(&storage.config_path())?;
    let config: RuntimeConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;
    Ok(config)
}

/// Write the process model
pub fn write_model(root: &Path, model: &Model) -> Result<()> {
    let storage = Storage::new(root.to_path_buf());
    let json = serde_json::to_vec_pretty(model).context("Failed to serialize model")?;
    storage.write_atomic(&storage.model_path(), &json)?;
    Ok(())
}

/// Load the process model
pub fn load_model(root: &Path) -> Result<Model> {
    let storage = Storage::new(root.to_path_buf());
    let path = storage.model_path();
    let data = storage.read_file(&path)?;
    let model: Model = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to deserialize model: {:?}", path))?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();

        init_storage(&root).unwrap();

        let config = RuntimeConfig {
            root: root.clone(),
            trace: false,
            trace_capacity: 16,
            validate_fingerprints: false,
        };

        write_config(&config).unwrap();
        let loaded = load_config(&root).unwrap();

        assert_eq!(loaded.trace_capacity, 16);
        assert!(!loaded.trace);
        assert!(!loaded.validate_fingerprints);
    }

    #[test]
    fn test_write_and_read_model() {
        let temp = TempDir::new().unwrap();
        let model = Model::sample();

        write_model(temp.path(), &model).unwrap();
        assert_eq!(load_model(temp.path()).unwrap(), model);
    }

    #[test]
    fn test_missing_model() {
        let temp = TempDir::new().unwrap();
        let err = load_model(temp.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_element_ids_rejected() {
        let temp = TempDir::new().unwrap();
        let mut json = serde_json::to_value(Model::sample()).unwrap();
        let elements = json["elements"].as_array_mut().unwrap();
        let first = elements[0].clone();
        elements.push(first);
        fs::write(
            temp.path().join("model.json"),
            serde_json::to_vec(&json).unwrap(),
        )
        .unwrap();

        let err = load_model(temp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("is defined more than once"));
    }

    #[test]
    fn test_atomic_write() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let test_file = temp.path().join("test.dat");

        let data = b"Hello, world!";
        storage.write_atomic(&test_file, data).unwrap();

        let read_data = storage.read_file(&test_file).unwrap();
        assert_eq!(data, &read_data[..]);
        assert!(!temp.path().join("test.tmp").exists());
    }
}
