//! 生成器模型
//!
//! 生成器是可插拔的推导规则：声明有序的输入角色（对象类型），
//! 对每个满足条件的输入组合执行确定性的变换，产生新的几何形状。
//! 生成器的注册顺序决定 [`GeneratorId`]，也是去重时的次级排序依据。

use crate::error::{ConfigurationError, GeneratorFault};
use crate::geometry::Shape;
use crate::object::{ObjectKind, RelevantObject};
use crate::predicate::SelectionPredicateCollection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 生成器ID（注册序号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorId(pub usize);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generator:{}", self.0)
    }
}

/// 生成器设置（可持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// 是否启用
    pub is_active: bool,
    /// 只使用时间上相邻的对象作为输入
    pub is_sequential: bool,
    /// 输入可以来自当前层及所有更浅的层
    pub is_deep: bool,
    /// 产物相关度相对父对象的比例
    pub relevancy_ratio: f64,
    /// 产物是否可继承选中状态
    pub generates_inheritable: bool,
    /// 各输入角色的谓词集合，缺省的角色不做限制
    pub role_predicates: Vec<SelectionPredicateCollection>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            is_active: true,
            is_sequential: false,
            is_deep: false,
            relevancy_ratio: 1.0,
            generates_inheritable: true,
            role_predicates: Vec::new(),
        }
    }
}

impl GeneratorSettings {
    /// 校验设置，`role_count` 为生成器声明的角色数
    pub fn validate(&self, name: &str, role_count: usize) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.relevancy_ratio) {
            return Err(ConfigurationError::InvalidRelevancyRatio(self.relevancy_ratio));
        }
        if self.role_predicates.len() > role_count {
            return Err(ConfigurationError::RoleCountMismatch {
                generator: name.to_string(),
                expected: role_count,
                found: self.role_predicates.len(),
            });
        }
        self.role_predicates
            .iter()
            .try_for_each(SelectionPredicateCollection::validate)
    }

    /// 某个角色的谓词集合
    pub fn predicates_for(&self, role: usize) -> SelectionPredicateCollection {
        self.role_predicates.get(role).cloned().unwrap_or_default()
    }
}

/// 输入角色：对象类型 + 谓词集合
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub kind: ObjectKind,
    pub predicates: SelectionPredicateCollection,
}

/// 生成器接口
pub trait Generator: Send + Sync {
    /// 唯一名称，用于偏好设置
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// 有序的输入角色类型
    fn roles(&self) -> &[ObjectKind];

    fn default_settings(&self) -> GeneratorSettings {
        GeneratorSettings::default()
    }

    /// 对一个输入组合执行变换
    ///
    /// `inputs` 的长度和类型与 [`roles`](Generator::roles) 一致。
    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault>;
}

#[derive(Clone)]
struct GeneratorEntry {
    generator: Arc<dyn Generator>,
    settings: GeneratorSettings,
}

/// 已注册的生成器集合
#[derive(Clone, Default)]
pub struct GeneratorSet {
    entries: Vec<GeneratorEntry>,
}

impl fmt::Debug for GeneratorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.generator.name()))
            .finish()
    }
}

impl GeneratorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用默认设置注册生成器
    pub fn register(&mut self, generator: impl Generator + 'static) -> GeneratorId {
        let settings = generator.default_settings();
        let id = GeneratorId(self.entries.len());
        self.entries.push(GeneratorEntry {
            generator: Arc::new(generator),
            settings,
        });
        id
    }

    /// 使用指定设置注册生成器
    pub fn register_with(
        &mut self,
        generator: impl Generator + 'static,
        settings: GeneratorSettings,
    ) -> Result<GeneratorId, ConfigurationError> {
        settings.validate(generator.name(), generator.roles().len())?;
        let id = GeneratorId(self.entries.len());
        self.entries.push(GeneratorEntry {
            generator: Arc::new(generator),
            settings,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: GeneratorId) -> Option<&dyn Generator> {
        self.entries.get(id.0).map(|e| e.generator.as_ref())
    }

    /// 共享的生成器句柄，在修改推导图时不借用集合本身
    pub fn shared(&self, id: GeneratorId) -> Option<Arc<dyn Generator>> {
        self.entries.get(id.0).map(|e| Arc::clone(&e.generator))
    }

    pub fn settings(&self, id: GeneratorId) -> Option<&GeneratorSettings> {
        self.entries.get(id.0).map(|e| &e.settings)
    }

    /// 更新设置，校验失败时不做任何修改；返回设置是否真的改变
    pub fn update_settings(
        &mut self,
        id: GeneratorId,
        settings: GeneratorSettings,
    ) -> Result<Option<bool>, ConfigurationError> {
        let Some(entry) = self.entries.get_mut(id.0) else {
            return Ok(None);
        };
        settings.validate(entry.generator.name(), entry.generator.roles().len())?;
        let changed = entry.settings != settings;
        entry.settings = settings;
        Ok(Some(changed))
    }

    /// 组合类型与谓词得到完整的角色列表
    pub fn roles(&self, id: GeneratorId) -> Vec<Role> {
        let Some(entry) = self.entries.get(id.0) else {
            return Vec::new();
        };
        entry
            .generator
            .roles()
            .iter()
            .enumerate()
            .map(|(i, kind)| Role {
                kind: *kind,
                predicates: entry.settings.predicates_for(i),
            })
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<GeneratorId> {
        self.entries
            .iter()
            .position(|e| e.generator.name() == name)
            .map(GeneratorId)
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (GeneratorId, &dyn Generator, &GeneratorSettings)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (GeneratorId(i), e.generator.as_ref(), &e.settings))
    }

    /// 按注册顺序遍历已启用的生成器
    pub fn iter_active(&self) -> impl Iterator<Item = (GeneratorId, &dyn Generator, &GeneratorSettings)> {
        self.iter().filter(|(_, _, settings)| settings.is_active)
    }

    /// 是否有启用的顺序生成器，其输入依赖时间顺序
    pub fn has_sequential(&self) -> bool {
        self.iter_active().any(|(_, _, settings)| settings.is_sequential)
    }

    /// 是否有启用的生成器按对象状态过滤输入
    pub fn has_role_predicates(&self) -> bool {
        self.iter_active()
            .any(|(_, _, settings)| settings.role_predicates.iter().any(|p| !p.is_empty()))
    }

    /// 导出所有设置，以名称为键
    pub fn export_settings(&self) -> BTreeMap<String, GeneratorSettings> {
        self.entries
            .iter()
            .map(|e| (e.generator.name().to_string(), e.settings.clone()))
            .collect()
    }

    /// 应用按名称保存的设置
    ///
    /// 先校验全部条目，任何一条非法则整体拒绝；未知名称被忽略。
    /// 返回设置发生变化的生成器数量。
    pub fn apply_settings(
        &mut self,
        settings: &BTreeMap<String, GeneratorSettings>,
    ) -> Result<usize, ConfigurationError> {
        for entry in &self.entries {
            if let Some(s) = settings.get(entry.generator.name()) {
                s.validate(entry.generator.name(), entry.generator.roles().len())?;
            }
        }

        let mut changed = 0;
        for entry in &mut self.entries {
            match settings.get(entry.generator.name()) {
                Some(s) if *s != entry.settings => {
                    entry.settings = s.clone();
                    changed += 1;
                }
                Some(_) => {}
                None => {
                    tracing::debug!("No saved settings for generator {}", entry.generator.name());
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::MidpointGenerator;
    use crate::predicate::SelectionPredicate;

    #[test]
    fn test_register_order_defines_ids() {
        let mut set = GeneratorSet::new();
        let a = set.register(MidpointGenerator);
        assert_eq!(a, GeneratorId(0));
        assert_eq!(set.find_by_name("Midpoint"), Some(a));
        assert_eq!(set.roles(a).len(), 2);
        assert!(set.roles(a).iter().all(|r| r.predicates.is_empty()));
    }

    #[test]
    fn test_update_settings_validates() {
        let mut set = GeneratorSet::new();
        let id = set.register(MidpointGenerator);

        let bad = GeneratorSettings {
            relevancy_ratio: 2.0,
            ..Default::default()
        };
        assert!(set.update_settings(id, bad).is_err());
        assert_eq!(set.settings(id).unwrap().relevancy_ratio, 1.0);

        let too_many = GeneratorSettings {
            role_predicates: vec![SelectionPredicateCollection::new(); 3],
            ..Default::default()
        };
        assert!(matches!(
            set.update_settings(id, too_many),
            Err(ConfigurationError::RoleCountMismatch { expected: 2, found: 3, .. })
        ));

        let good = GeneratorSettings {
            role_predicates: vec![SelectionPredicateCollection::from_predicates([
                SelectionPredicate::locked(),
            ])],
            ..Default::default()
        };
        assert_eq!(set.update_settings(id, good).unwrap(), Some(true));
        assert!(!set.roles(id)[0].predicates.is_empty());
        assert!(set.roles(id)[1].predicates.is_empty());
    }

    #[test]
    fn test_apply_settings_by_name() {
        let mut set = GeneratorSet::new();
        let id = set.register(MidpointGenerator);

        let mut saved = set.export_settings();
        saved.get_mut("Midpoint").unwrap().is_active = false;
        saved.insert("Unknown".to_string(), GeneratorSettings::default());

        assert_eq!(set.apply_settings(&saved).unwrap(), 1);
        assert!(!set.settings(id).unwrap().is_active);
        assert_eq!(set.iter_active().count(), 0);
    }
}
