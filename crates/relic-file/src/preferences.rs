//! 偏好设置文件
//!
//! 两种格式：
//! - `.json`：便于手工编辑
//! - `.relic`：MessagePack + Zstd 的紧凑二进制格式，带 16 字节文件头

use crate::error::FileError;
use relic_core::config::Preferences;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// `.relic` 偏好文件的魔数
const MAGIC: [u8; 4] = *b"RLIC";

const FORMAT_VERSION: u32 = 1;

const COMPRESSION_LEVEL: i32 = 3;

/// 标志位：载荷经过 zstd 压缩
const FLAG_ZSTD: u32 = 0x1;

const HEADER_LEN: usize = 16;

/// `.relic` 文件头
///
/// 布局（小端）：魔数 `RLIC` | 版本 | 标志 | 载荷长度，之后紧跟 MessagePack 载荷。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreferencesHeader {
    version: u32,
    flags: u32,
    payload_len: u32,
}

impl PreferencesHeader {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.flags.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, FileError> {
        if bytes[0..4] != MAGIC {
            return Err(FileError::InvalidFormat(
                "Not a Relic preferences file".to_string(),
            ));
        }
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Ok(Self {
            version: word(4),
            flags: word(8),
            payload_len: word(12),
        })
    }

    fn is_compressed(&self) -> bool {
        self.flags & FLAG_ZSTD != 0
    }
}

/// 保存为 JSON
pub fn save_json(preferences: &Preferences, path: &Path) -> Result<(), FileError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, preferences)?;
    tracing::info!(
        "Saved preferences for {} generators to {}",
        preferences.generators.len(),
        path.display()
    );
    Ok(())
}

/// 从 JSON 读取，缺省字段取默认值
pub fn load_json(path: &Path) -> Result<Preferences, FileError> {
    let reader = BufReader::new(File::open(path)?);
    let preferences: Preferences = serde_json::from_reader(reader)?;
    preferences.config.validate()?;
    tracing::info!("Loaded preferences from {}", path.display());
    Ok(preferences)
}

/// 保存为二进制格式，载荷总是压缩
pub fn save_binary(preferences: &Preferences, path: &Path) -> Result<(), FileError> {
    let payload = zstd::encode_all(rmp_serde::to_vec_named(preferences)?.as_slice(), COMPRESSION_LEVEL)?;
    let header = PreferencesHeader {
        version: FORMAT_VERSION,
        flags: FLAG_ZSTD,
        payload_len: u32::try_from(payload.len())
            .map_err(|_| FileError::InvalidFormat("Preferences too large".to_string()))?,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header.encode())?;
    writer.write_all(&payload)?;
    writer.flush()?;

    tracing::info!(
        "Saved preferences to {} ({} byte payload)",
        path.display(),
        payload.len()
    );
    Ok(())
}

/// 从二进制格式读取，未压缩的载荷同样接受
pub fn load_binary(path: &Path) -> Result<Preferences, FileError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut bytes)?;
    let header = PreferencesHeader::decode(&bytes)?;

    if header.version > FORMAT_VERSION {
        return Err(FileError::UnsupportedVersion(format!(
            "File version {} is newer than supported version {}",
            header.version, FORMAT_VERSION
        )));
    }
    if header.flags & !FLAG_ZSTD != 0 {
        tracing::warn!("Ignoring unknown header flags {:#x}", header.flags & !FLAG_ZSTD);
    }

    let mut payload = vec![0u8; header.payload_len as usize];
    reader.read_exact(&mut payload)?;
    if header.is_compressed() {
        payload = zstd::decode_all(payload.as_slice())?;
    }
    let preferences: Preferences = rmp_serde::from_slice(&payload)?;
    preferences.config.validate()?;

    tracing::info!("Loaded preferences from {}", path.display());
    Ok(preferences)
}

/// 按扩展名选择格式：`.json` 为 JSON，其余为二进制
pub fn save(preferences: &Preferences, path: &Path) -> Result<(), FileError> {
    if is_json(path) {
        save_json(preferences, path)
    } else {
        save_binary(preferences, path)
    }
}

pub fn load(path: &Path) -> Result<Preferences, FileError> {
    if is_json(path) {
        load_json(path)
    } else {
        load_binary(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
