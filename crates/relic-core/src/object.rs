//! 相关对象实体
//!
//! 相关对象是从现有内容推导出的虚拟几何构造（点、直线、圆），
//! 或者包装外部种子的锁定参考。对象之间的父子关系只保存 ID，不持有所有权，
//! 对象本身存放在 [`ObjectArena`](crate::arena::ObjectArena) 中。

use crate::generator::GeneratorId;
use crate::geometry::Shape;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 图层深度（0 为锁定种子层）
pub type LayerId = usize;

/// 对象ID：竞技场槽位索引 + 代数
///
/// 槽位被回收后代数递增，旧ID不会指向新对象。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// 外部种子记录的稳定标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeedId(pub u64);

impl fmt::Display for SeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed:{}", self.0)
    }
}

/// 对象类型（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Point,
    Line,
    Circle,
    Reference,
}

impl ObjectKind {
    /// 所有类型，按桶索引顺序
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Point,
        ObjectKind::Line,
        ObjectKind::Circle,
        ObjectKind::Reference,
    ];

    /// 类型数量
    pub const COUNT: usize = 4;

    /// 在按类型分桶的容器中的索引
    pub fn index(&self) -> usize {
        match self {
            ObjectKind::Point => 0,
            ObjectKind::Line => 1,
            ObjectKind::Circle => 2,
            ObjectKind::Reference => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Point => "Point",
            ObjectKind::Line => "Line",
            ObjectKind::Circle => "Circle",
            ObjectKind::Reference => "Reference",
        }
    }

    /// 是否可以绘制和捕捉
    pub fn is_drawable(&self) -> bool {
        !matches!(self, ObjectKind::Reference)
    }
}

/// 父组：产生对象的一个输入组合
///
/// `inputs` 按角色顺序排列，相邻的相同角色内按ID排序，同一组合只有一种写法。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParentGroup {
    pub generator: GeneratorId,
    pub inputs: Vec<ObjectId>,
}

impl ParentGroup {
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.inputs.contains(id)
    }
}

/// 相关对象
///
/// 字段只能通过 [`LayerCollection`](crate::layers::LayerCollection) 修改，
/// 以维护父子链接、排序和传播不变量。
#[derive(Debug, Clone)]
pub struct RelevantObject {
    pub(crate) id: ObjectId,
    /// 插入顺序
    pub(crate) serial: u64,
    pub(crate) shape: Shape,
    pub(crate) time: f64,
    pub(crate) relevancy: f64,
    /// 生成器的相关度系数，锁定对象为 1.0
    pub(crate) relevancy_ratio: f64,
    pub(crate) disposed: bool,
    pub(crate) is_selected: bool,
    pub(crate) is_locked: bool,
    pub(crate) is_inheritable: bool,
    /// 所有父对象（各父组的并集）
    pub(crate) parent_objects: BTreeSet<ObjectId>,
    /// 产生该对象的各个输入组合
    pub(crate) parent_groups: Vec<ParentGroup>,
    pub(crate) child_objects: BTreeSet<ObjectId>,
    pub(crate) layer: LayerId,
    pub(crate) generator: Option<GeneratorId>,
    /// 来源种子（仅种子对象）
    pub(crate) seed: Option<SeedId>,
}

impl RelevantObject {
    /// 创建锁定的种子对象
    pub fn locked(shape: Shape, time: f64, seed: Option<SeedId>) -> Self {
        Self {
            id: ObjectId {
                index: u32::MAX,
                generation: 0,
            },
            serial: 0,
            shape,
            time,
            relevancy: 1.0,
            relevancy_ratio: 1.0,
            disposed: false,
            is_selected: false,
            is_locked: true,
            is_inheritable: false,
            parent_objects: BTreeSet::new(),
            parent_groups: Vec::new(),
            child_objects: BTreeSet::new(),
            layer: 0,
            generator: None,
            seed,
        }
    }

    /// 创建由生成器推导出的对象
    ///
    /// 时间、相关度和选中状态由插入时的传播计算。
    pub fn derived(shape: Shape, generator: GeneratorId, relevancy_ratio: f64, inheritable: bool) -> Self {
        Self {
            generator: Some(generator),
            relevancy_ratio,
            is_locked: false,
            is_inheritable: inheritable,
            ..Self::locked(shape, 0.0, None)
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn relevancy(&self) -> f64 {
        self.relevancy
    }

    pub fn relevancy_ratio(&self) -> f64 {
        self.relevancy_ratio
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn is_inheritable(&self) -> bool {
        self.is_inheritable
    }

    pub fn parent_objects(&self) -> &BTreeSet<ObjectId> {
        &self.parent_objects
    }

    pub fn parent_groups(&self) -> &[ParentGroup] {
        &self.parent_groups
    }

    pub fn child_objects(&self) -> &BTreeSet<ObjectId> {
        &self.child_objects
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn generator(&self) -> Option<GeneratorId> {
        self.generator
    }

    pub fn seed(&self) -> Option<SeedId> {
        self.seed
    }

    /// 添加一个父组，同时更新父对象并集
    pub(crate) fn add_parent_group(&mut self, group: ParentGroup) {
        self.parent_objects.extend(group.inputs.iter().copied());
        self.parent_groups.push(group);
    }

    /// 只保留 `keep` 接受的父组，返回不再是父对象的ID
    pub(crate) fn retain_groups(&mut self, keep: impl Fn(&ParentGroup) -> bool) -> Vec<ObjectId> {
        self.parent_groups.retain(|group| keep(group));
        self.rebuild_parents()
    }

    fn rebuild_parents(&mut self) -> Vec<ObjectId> {
        let remaining: BTreeSet<ObjectId> = self
            .parent_groups
            .iter()
            .flat_map(|group| group.inputs.iter().copied())
            .collect();
        let lost = self.parent_objects.difference(&remaining).copied().collect();
        self.parent_objects = remaining;
        lost
    }

    /// 删除所有包含 `parent` 的父组，返回不再是父对象的ID
    pub(crate) fn drop_parent(&mut self, parent: ObjectId) -> Vec<ObjectId> {
        self.parent_groups.retain(|group| !group.contains(&parent));
        let mut lost = self.rebuild_parents();
        lost.retain(|id| *id != parent);
        lost
    }

    /// 与另一个对象形状的差异度
    pub fn difference(&self, other: &Shape) -> f64 {
        self.shape.difference(other)
    }
}
