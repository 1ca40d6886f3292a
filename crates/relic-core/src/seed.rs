//! 种子输入
//!
//! 外部参考记录（稳定标识 + 时间 + 位置）被包装为锁定、不可继承、没有父对象的相关对象，
//! 放在第 0 层。

use crate::geometry::{Reference, RelevantPoint, Shape};
use crate::math::Point2;
use crate::object::SeedId;
use serde::{Deserialize, Serialize};

/// 种子包装成的对象类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedKind {
    /// 可绘制的点
    #[default]
    Point,
    /// 不可绘制的参考
    Reference,
}

/// 外部参考记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub identity: SeedId,
    pub time: f64,
    pub position: Point2,
    #[serde(default)]
    pub kind: SeedKind,
}

impl SeedRecord {
    pub fn point(identity: u64, time: f64, x: f64, y: f64) -> Self {
        Self {
            identity: SeedId(identity),
            time,
            position: Point2::new(x, y),
            kind: SeedKind::Point,
        }
    }

    pub fn reference(identity: u64, time: f64, x: f64, y: f64) -> Self {
        Self {
            kind: SeedKind::Reference,
            ..Self::point(identity, time, x, y)
        }
    }

    /// 时间和位置都是有限值
    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.position.x.is_finite() && self.position.y.is_finite()
    }

    /// 种子对应的几何形状
    pub fn shape(&self) -> Shape {
        match self.kind {
            SeedKind::Point => Shape::Point(RelevantPoint::from_point2(self.position)),
            SeedKind::Reference => Shape::Reference(Reference {
                identity: self.identity,
                position: self.position,
            }),
        }
    }

    /// 从种子对象的形状还原记录
    pub(crate) fn from_shape(identity: SeedId, time: f64, shape: &Shape) -> Self {
        let kind = match shape {
            Shape::Reference(_) => SeedKind::Reference,
            _ => SeedKind::Point,
        };
        Self {
            identity,
            time,
            position: shape.anchor(),
            kind,
        }
    }
}

/// 种子提供者（由宿主提供，例如从谱面的物件中提取）
pub trait SeedProvider: Send {
    fn seeds(&mut self) -> Vec<SeedRecord>;
}

/// 固定种子列表
#[derive(Debug, Clone, Default)]
pub struct StaticSeeds(pub Vec<SeedRecord>);

impl SeedProvider for StaticSeeds {
    fn seeds(&mut self) -> Vec<SeedRecord> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    #[test]
    fn test_shape_roundtrip() {
        let record = SeedRecord::reference(9, 1.5, 3.0, 4.0);
        let shape = record.shape();
        assert_eq!(shape.kind(), ObjectKind::Reference);
        assert_eq!(SeedRecord::from_shape(record.identity, 1.5, &shape), record);
    }

    #[test]
    fn test_kind_defaults_to_point() {
        let record: SeedRecord =
            serde_json::from_str(r#"{"identity": 1, "time": 0.0, "position": [1.0, 2.0]}"#).unwrap();
        assert_eq!(record.kind, SeedKind::Point);
        assert_eq!(record.shape().kind(), ObjectKind::Point);
    }
}
