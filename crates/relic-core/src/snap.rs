//! 对象捕捉查询
//!
//! 在允许的图层范围内寻找离光标最近的可绘制对象：
//! - 距离按对象类型计算（点、直线、圆）
//! - 距离相同时取较浅的图层，再取较早插入的对象
//!
//! 查询只读，从不修改推导图。

use crate::layers::LayerCollection;
use crate::math::Point2;
use crate::object::{LayerId, ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};

/// 类型掩码（位域，用于快速启用/禁用可绘制类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMask {
    bits: u8,
}

impl KindMask {
    pub const POINT: u8 = 1 << 0;
    pub const LINE: u8 = 1 << 1;
    pub const CIRCLE: u8 = 1 << 2;

    pub const NONE: KindMask = KindMask { bits: 0 };
    pub const ALL: KindMask = KindMask {
        bits: Self::POINT | Self::LINE | Self::CIRCLE,
    };

    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    fn bit(kind: ObjectKind) -> u8 {
        match kind {
            ObjectKind::Point => Self::POINT,
            ObjectKind::Line => Self::LINE,
            ObjectKind::Circle => Self::CIRCLE,
            ObjectKind::Reference => 0,
        }
    }

    /// 类型是否启用；不可绘制的类型永远不启用
    pub fn is_enabled(&self, kind: ObjectKind) -> bool {
        self.bits & Self::bit(kind) != 0
    }

    pub fn set(&mut self, kind: ObjectKind, enabled: bool) {
        let bit = Self::bit(kind);
        if enabled {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn toggle(&mut self, kind: ObjectKind) {
        let enabled = self.is_enabled(kind);
        self.set(kind, !enabled);
    }
}

impl Default for KindMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// 捕捉配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    /// 捕捉容差（世界坐标）
    pub tolerance: f64,
    /// 参与捕捉的类型
    pub kinds: KindMask,
    /// 最深的图层，`None` 表示全部图层
    pub max_layer_depth: Option<LayerId>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            kinds: KindMask::default(),
            max_layer_depth: None,
        }
    }
}

/// 捕捉结果
#[derive(Debug, Clone, PartialEq)]
pub struct SnapPoint {
    /// 捕捉到的对象
    pub object: ObjectId,
    /// 对象上离光标最近的点
    pub point: Point2,
    /// 光标到对象的距离
    pub distance: f64,
    /// 对象所在图层
    pub layer: LayerId,
}

impl LayerCollection {
    /// 离 `point` 最近的可绘制对象
    pub fn nearest(
        &self,
        point: Point2,
        mask: KindMask,
        max_layer_depth: Option<LayerId>,
    ) -> Option<ObjectId> {
        self.nearest_with_distance(point, mask, max_layer_depth)
            .map(|(id, _)| id)
    }

    fn nearest_with_distance(
        &self,
        point: Point2,
        mask: KindMask,
        max_layer_depth: Option<LayerId>,
    ) -> Option<(ObjectId, f64)> {
        let last = max_layer_depth.map_or(self.inception_level(), |d| d.min(self.inception_level()));

        // (距离, 图层, 插入序号)
        let mut best: Option<(f64, LayerId, u64, ObjectId)> = None;
        for layer in &self.layers[..=last] {
            for kind in ObjectKind::ALL {
                if !kind.is_drawable() || !mask.is_enabled(kind) {
                    continue;
                }
                for id in layer.collection.bucket(kind) {
                    let Some(object) = self.arena.get(*id) else {
                        continue;
                    };
                    if object.is_disposed() {
                        continue;
                    }
                    let distance = object.shape().distance_to(&point);
                    if !distance.is_finite() {
                        continue;
                    }
                    let candidate = (distance, layer.depth, object.serial(), *id);
                    let better = match &best {
                        None => true,
                        Some((d, l, s, _)) => distance
                            .total_cmp(d)
                            .then(layer.depth.cmp(l))
                            .then(object.serial().cmp(s))
                            .is_lt(),
                    };
                    if better {
                        best = Some(candidate);
                    }
                }
            }
        }
        best.map(|(distance, _, _, id)| (id, distance))
    }

    /// 在容差内捕捉最近的对象
    pub fn snap(&self, point: Point2, config: &SnapConfig) -> Option<SnapPoint> {
        let (id, distance) = self.nearest_with_distance(point, config.kinds, config.max_layer_depth)?;
        if distance > config.tolerance {
            return None;
        }
        let object = self.arena.get(id)?;
        Some(SnapPoint {
            object: id,
            point: object.shape().nearest_point(&point),
            distance,
            layer: object.layer(),
        })
    }
}
