//! 宿主服务的文件实现

use crate::error::FileError;
use crate::{preferences, seeds};
use relic_core::config::{PreferenceStore, Preferences};
use relic_core::seed::{SeedProvider, SeedRecord};
use std::error::Error;
use std::path::{Path, PathBuf};

/// 文件形式的偏好设置存储，格式由扩展名决定
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&mut self) -> Result<Option<Preferences>, Box<dyn Error + Send + Sync>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(preferences::load(&self.path)?))
    }

    fn save(&mut self, preferences: &Preferences) -> Result<(), Box<dyn Error + Send + Sync>> {
        preferences::save(preferences, &self.path)?;
        Ok(())
    }
}

/// 从种子文档读取种子，每次调用重新读取文件
#[derive(Debug, Clone)]
pub struct SeedFile {
    path: PathBuf,
}

impl SeedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read(&self) -> Result<Vec<SeedRecord>, FileError> {
        Ok(seeds::import_seeds(&self.path)?.seeds)
    }
}

impl SeedProvider for SeedFile {
    fn seeds(&mut self) -> Vec<SeedRecord> {
        match self.read() {
            Ok(seeds) => seeds,
            Err(e) => {
                tracing::warn!("Failed to read seeds from {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_preferences_is_none() {
        let mut store = JsonPreferenceStore::new(std::env::temp_dir().join("relic_test_missing.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_store_roundtrip() {
        let path = std::env::temp_dir().join("relic_test_store.json");
        let mut store = JsonPreferenceStore::new(&path);
        let mut prefs = Preferences::default();
        prefs.config.inception_level = 2;

        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), Some(prefs));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unreadable_seed_file_yields_no_seeds() {
        let mut file = SeedFile::new(std::env::temp_dir().join("relic_test_no_such_seeds.json"));
        assert!(file.read().is_err());
        assert!(file.seeds().is_empty());
    }
}
