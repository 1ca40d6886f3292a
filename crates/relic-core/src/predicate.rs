//! 选择谓词
//!
//! 生成器的每个输入角色带有一个谓词集合，决定哪些对象可以填入该角色：
//! - 单个谓词是各个条件的合取
//! - 谓词集合为空时总是满足，否则任一谓词满足即可（析取）

use crate::error::ConfigurationError;
use crate::generator::GeneratorId;
use crate::object::RelevantObject;
use serde::{Deserialize, Serialize};

/// 选择谓词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPredicate {
    /// 对象必须被选中
    pub need_selected: bool,
    /// 对象必须被锁定
    pub need_locked: bool,
    /// 对象必须由当前生成器产生
    pub need_generated_by_this_generator: bool,
    /// 对象必须由其他生成器产生
    pub need_generated_by_other_generator: bool,
    /// 最小相关度
    pub min_relevancy: f64,
}

impl Default for SelectionPredicate {
    fn default() -> Self {
        Self {
            need_selected: false,
            need_locked: false,
            need_generated_by_this_generator: false,
            need_generated_by_other_generator: false,
            min_relevancy: 0.0,
        }
    }
}

impl SelectionPredicate {
    pub fn selected() -> Self {
        Self {
            need_selected: true,
            ..Default::default()
        }
    }

    pub fn locked() -> Self {
        Self {
            need_locked: true,
            ..Default::default()
        }
    }

    pub fn with_min_relevancy(mut self, min_relevancy: f64) -> Self {
        self.min_relevancy = min_relevancy;
        self
    }

    /// 检查对象是否满足谓词
    ///
    /// `generator` 为正在匹配输入的生成器。
    pub fn check(&self, object: &RelevantObject, generator: GeneratorId) -> bool {
        if self.need_selected && !object.is_selected() {
            return false;
        }
        if self.need_locked && !object.is_locked() {
            return false;
        }
        if self.need_generated_by_this_generator && object.generator() != Some(generator) {
            return false;
        }
        if self.need_generated_by_other_generator {
            match object.generator() {
                Some(g) if g != generator => {}
                _ => return false,
            }
        }
        object.relevancy() >= self.min_relevancy
    }

    /// 校验谓词本身是否自洽
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.min_relevancy) {
            return Err(ConfigurationError::MalformedPredicate {
                reason: format!("min_relevancy {} is outside [0, 1]", self.min_relevancy),
            });
        }
        if self.need_generated_by_this_generator && self.need_generated_by_other_generator {
            return Err(ConfigurationError::MalformedPredicate {
                reason: "cannot require both this generator and another generator".to_string(),
            });
        }
        Ok(())
    }
}

/// 谓词集合（析取）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionPredicateCollection {
    pub predicates: Vec<SelectionPredicate>,
}

impl SelectionPredicateCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_predicates(predicates: impl IntoIterator<Item = SelectionPredicate>) -> Self {
        Self {
            predicates: predicates.into_iter().collect(),
        }
    }

    pub fn push(&mut self, predicate: SelectionPredicate) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn check(&self, object: &RelevantObject, generator: GeneratorId) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|p| p.check(object, generator))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.predicates.iter().try_for_each(SelectionPredicate::validate)
    }
}
