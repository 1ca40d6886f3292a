//! 引擎配置与偏好设置文档

use crate::error::ConfigurationError;
use crate::generator::GeneratorSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 去重容差
    pub acceptable_difference: f64,
    /// 种子层之外的生成层数
    pub inception_level: usize,
    /// 捕捉查询的最大距离（None 表示不限）
    pub max_snap_distance: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acceptable_difference: 2.0,
            inception_level: 1,
            max_snap_distance: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_acceptable_difference(self.acceptable_difference)
    }
}

pub(crate) fn validate_acceptable_difference(value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidAcceptableDifference(value))
    }
}

/// 持久化的偏好设置
///
/// 推导图本身从不持久化，只保存配置和生成器设置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub config: EngineConfig,
    /// 生成器名称 -> 设置
    pub generators: BTreeMap<String, GeneratorSettings>,
}

/// 偏好设置存储（由宿主提供）
pub trait PreferenceStore: Send {
    /// 读取偏好设置，不存在时返回 None
    fn load(&mut self) -> Result<Option<Preferences>, Box<dyn std::error::Error + Send + Sync>>;

    fn save(&mut self, preferences: &Preferences) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        let bad = EngineConfig {
            acceptable_difference: -1.0,
            ..Default::default()
        };
        assert_eq!(
            bad.validate(),
            Err(ConfigurationError::InvalidAcceptableDifference(-1.0))
        );
        assert!(validate_acceptable_difference(f64::INFINITY).is_err());
    }

    #[test]
    fn test_preferences_json_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"config": {"inception_level": 3}}"#).unwrap();
        assert_eq!(prefs.config.inception_level, 3);
        assert_eq!(prefs.config.acceptable_difference, 2.0);
        assert!(prefs.generators.is_empty());
    }
}
