//! Relic 核心引擎
//!
//! 从外部参考点推导出“相关”的虚拟几何对象（点、直线、圆），供交互式对齐使用。
//!
//! # 架构设计
//!
//! 采用分层推导图：
//! - `LayerCollection`: 推导图的唯一写入者，持有对象竞技场和全部图层
//! - `RelevantObjectLayer`: 第 0 层为锁定种子，之后每层由上一层生成
//! - `Generator`: 可插拔的推导规则，按输入角色匹配对象
//! - `SelectionPredicate`: 角色的输入过滤条件
//!
//! 对象间的父子链接存放在竞技场中，以 `ObjectId` 相互引用。
//!
//! # 示例
//!
//! ```rust
//! use relic_core::prelude::*;
//!
//! let mut generators = GeneratorSet::new();
//! generators.register(MidpointGenerator);
//!
//! let seeds = [
//!     SeedRecord::point(1, 0.0, 0.0, 0.0),
//!     SeedRecord::point(2, 1.0, 100.0, 0.0),
//! ];
//! let (graph, _) = LayerCollection::with_seeds(EngineConfig::default(), generators, &seeds).unwrap();
//!
//! // 中点 (50, 0) 位于第 1 层
//! let id = graph.nearest(Point2::new(49.0, 0.0), KindMask::ALL, None).unwrap();
//! assert_eq!(graph.object(id).unwrap().layer(), 1);
//! ```

pub mod arena;
pub mod background;
pub mod collection;
pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
mod generation;
pub mod generator;
pub mod generators;
pub mod geometry;
pub mod layer;
pub mod layers;
pub mod math;
pub mod object;
pub mod predicate;
mod propagation;
pub mod seed;
pub mod selection;
pub mod snap;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::background::BackgroundRegeneration;
    pub use crate::collection::RelevantObjectCollection;
    pub use crate::config::{EngineConfig, PreferenceStore, Preferences};
    pub use crate::draw::{Canvas, Color, DrawStyle};
    pub use crate::engine::{EngineContext, RelevanceEngine};
    pub use crate::error::{ConfigurationError, EngineError, GeneratorFault};
    pub use crate::generator::{Generator, GeneratorId, GeneratorSet, GeneratorSettings, Role};
    pub use crate::generators::{
        CircleCenterGenerator, CircleThroughPointsGenerator, LineIntersectionGenerator,
        LineThroughPointsGenerator, MidpointGenerator,
    };
    pub use crate::geometry::{Reference, RelevantCircle, RelevantLine, RelevantPoint, Shape};
    pub use crate::layer::{GenerationReport, RelevantObjectLayer};
    pub use crate::layers::{LayerCollection, LayerStats};
    pub use crate::math::{Point2, Transform, Vector2};
    pub use crate::object::{LayerId, ObjectId, ObjectKind, ParentGroup, RelevantObject, SeedId};
    pub use crate::predicate::{SelectionPredicate, SelectionPredicateCollection};
    pub use crate::seed::{SeedKind, SeedProvider, SeedRecord, StaticSeeds};
    pub use crate::snap::{KindMask, SnapConfig, SnapPoint};
}

/// 默认的内置生成器集合，按注册顺序
pub fn default_generators() -> generator::GeneratorSet {
    let mut set = generator::GeneratorSet::new();
    set.register(generators::MidpointGenerator);
    set.register(generators::LineThroughPointsGenerator);
    set.register(generators::CircleThroughPointsGenerator);
    set.register(generators::LineIntersectionGenerator);
    set.register(generators::CircleCenterGenerator);
    set
}
