//! 相关对象层
//!
//! 每层拥有一个对象集合，并通过前后链接串成推导链：
//! 第 0 层存放锁定种子，第 n 层的对象由第 n-1 层（深度生成器可以用更浅的层）推导得到。

use crate::collection::RelevantObjectCollection;
use crate::object::{LayerId, ParentGroup};
use std::collections::BTreeSet;

/// 相关对象层
#[derive(Debug, Clone)]
pub struct RelevantObjectLayer {
    pub(crate) depth: LayerId,
    pub(crate) previous: Option<LayerId>,
    pub(crate) next: Option<LayerId>,
    pub(crate) collection: RelevantObjectCollection,
    /// 产物落在本层、已执行但没有留下父组的输入组合，不再重复执行
    pub(crate) spent: BTreeSet<ParentGroup>,
}

impl RelevantObjectLayer {
    pub(crate) fn new(depth: LayerId, previous: Option<LayerId>) -> Self {
        Self {
            depth,
            previous,
            next: None,
            collection: RelevantObjectCollection::new(),
            spent: BTreeSet::new(),
        }
    }

    pub fn depth(&self) -> LayerId {
        self.depth
    }

    /// 是否为锁定种子层
    pub fn is_locked_layer(&self) -> bool {
        self.depth == 0
    }

    pub fn previous(&self) -> Option<LayerId> {
        self.previous
    }

    pub fn next(&self) -> Option<LayerId> {
        self.next
    }

    pub fn collection(&self) -> &RelevantObjectCollection {
        &self.collection
    }

    pub fn count(&self) -> usize {
        self.collection.count()
    }
}

/// 一次生成/修改操作的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// 新建的对象数
    pub created: usize,
    /// 合并到已有对象的候选数
    pub merged: usize,
    /// 被跳过的生成器失败数
    pub faults: usize,
    /// 去重时出现多个相似对象的次数
    pub ambiguities: usize,
    /// 释放的对象数
    pub disposed: usize,
    /// 因时间或位置不是有限值而被跳过的种子数
    pub rejected: usize,
}

impl GenerationReport {
    pub fn absorb(&mut self, other: GenerationReport) {
        self.created += other.created;
        self.merged += other.merged;
        self.faults += other.faults;
        self.ambiguities += other.ambiguities;
        self.disposed += other.disposed;
        self.rejected += other.rejected;
    }

    pub fn is_empty(&self) -> bool {
        *self == GenerationReport::default()
    }
}
