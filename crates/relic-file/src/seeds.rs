//! 锁定种子的导出与导入
//!
//! 只保存种子层的扁平列表，推导图在导入后重新生成。

use crate::error::FileError;
use chrono::{DateTime, Utc};
use relic_core::seed::SeedRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// 当前种子文档版本
const SEED_FORMAT_VERSION: u32 = 1;

/// 种子文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedDocument {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub seeds: Vec<SeedRecord>,
}

impl SeedDocument {
    pub fn new(seeds: Vec<SeedRecord>) -> Self {
        Self {
            format_version: SEED_FORMAT_VERSION,
            exported_at: Utc::now(),
            seeds,
        }
    }
}

/// 导出种子列表
pub fn export_seeds(seeds: &[SeedRecord], path: &Path) -> Result<(), FileError> {
    let document = SeedDocument::new(seeds.to_vec());
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &document)?;
    tracing::info!("Exported {} seeds to {}", seeds.len(), path.display());
    Ok(())
}

/// 导入种子文档
pub fn import_seeds(path: &Path) -> Result<SeedDocument, FileError> {
    let reader = BufReader::new(File::open(path)?);
    let document: SeedDocument = serde_json::from_reader(reader)?;

    if document.format_version > SEED_FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "Seed file version {} is newer than supported version {}",
            document.format_version, SEED_FORMAT_VERSION
        )));
    }
    if let Some(bad) = document.seeds.iter().find(|s| !s.time.is_finite()) {
        return Err(FileError::InvalidFormat(format!(
            "Seed {} has a non-finite time",
            bad.identity
        )));
    }

    tracing::info!(
        "Imported {} seeds exported at {} from {}",
        document.seeds.len(),
        document.exported_at.format("%Y-%m-%d %H:%M:%S"),
        path.display()
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import() {
        let path = std::env::temp_dir().join("relic_test_seeds.json");
        let seeds = vec![
            SeedRecord::point(1, 0.0, 10.0, 20.0),
            SeedRecord::reference(2, 150.0, 256.0, 192.0),
        ];

        export_seeds(&seeds, &path).expect("Failed to export");
        let document = import_seeds(&path).expect("Failed to import");
        assert_eq!(document.format_version, SEED_FORMAT_VERSION);
        assert_eq!(document.seeds, seeds);
        assert!(document.exported_at <= Utc::now());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_newer_version_rejected() {
        let path = std::env::temp_dir().join("relic_test_seeds_v9.json");
        let mut document = SeedDocument::new(Vec::new());
        document.format_version = 9;
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).expect("Failed to write");

        assert!(matches!(import_seeds(&path), Err(FileError::UnsupportedVersion(_))));
        std::fs::remove_file(&path).ok();
    }
}
