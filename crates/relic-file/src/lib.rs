//! Relic 文件格式处理
//!
//! 推导图本身从不持久化，这里只处理：
//! - 偏好设置（JSON 或 MessagePack + Zstd 的二进制格式）
//! - 锁定种子的扁平列表（用于重新载入种子）

pub mod error;
pub mod preferences;
pub mod seeds;
pub mod store;

pub use error::FileError;
pub use seeds::SeedDocument;
pub use store::{JsonPreferenceStore, SeedFile};
