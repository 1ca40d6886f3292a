//! 相关对象的几何图元
//!
//! 支持的图元：
//! - 点 (RelevantPoint)
//! - 无限直线 (RelevantLine)
//! - 圆 (RelevantCircle)
//! - 外部参考 (Reference)，锁定种子的包装，不可绘制
//!
//! 每种图元提供到点的距离、最近点、相互求交，以及用于去重的同类相似度。

use crate::math::{is_finite_point, Point2, Vector2, EPSILON};
use crate::object::{ObjectKind, SeedId};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 直线相似度中角度差的权重（弧度 -> 坐标单位）
pub const LINE_ANGLE_WEIGHT: f64 = 100.0;

/// 几何形状枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(RelevantPoint),
    Line(RelevantLine),
    Circle(RelevantCircle),
    Reference(Reference),
}

impl Shape {
    /// 形状对应的对象类型
    pub fn kind(&self) -> ObjectKind {
        match self {
            Shape::Point(_) => ObjectKind::Point,
            Shape::Line(_) => ObjectKind::Line,
            Shape::Circle(_) => ObjectKind::Circle,
            Shape::Reference(_) => ObjectKind::Reference,
        }
    }

    /// 是否可以绘制/捕捉
    pub fn is_drawable(&self) -> bool {
        self.kind().is_drawable()
    }

    /// 所有坐标分量是否为有限值
    pub fn is_finite(&self) -> bool {
        match self {
            Shape::Point(p) => is_finite_point(&p.position),
            Shape::Line(l) => {
                is_finite_point(&l.origin)
                    && l.direction.x.is_finite()
                    && l.direction.y.is_finite()
                    && (l.direction.norm() - 1.0).abs() < 1e-6
            }
            Shape::Circle(c) => {
                is_finite_point(&c.center) && c.radius.is_finite() && c.radius >= 0.0
            }
            Shape::Reference(r) => is_finite_point(&r.position),
        }
    }

    /// 形状的代表位置（点的位置、直线原点、圆心、参考位置）
    pub fn anchor(&self) -> Point2 {
        match self {
            Shape::Point(p) => p.position,
            Shape::Line(l) => l.origin,
            Shape::Circle(c) => c.center,
            Shape::Reference(r) => r.position,
        }
    }

    /// 计算点到形状的距离
    ///
    /// 参考对象不可捕捉，返回无穷大。
    pub fn distance_to(&self, point: &Point2) -> f64 {
        match self {
            Shape::Point(p) => p.distance_to(point),
            Shape::Line(l) => l.distance_to(point),
            Shape::Circle(c) => c.distance_to(point),
            Shape::Reference(_) => f64::INFINITY,
        }
    }

    /// 形状上离给定点最近的点
    pub fn nearest_point(&self, point: &Point2) -> Point2 {
        match self {
            Shape::Point(p) => p.position,
            Shape::Line(l) => l.nearest_point(point),
            Shape::Circle(c) => c.nearest_point(point),
            Shape::Reference(r) => r.position,
        }
    }

    /// 与另一个形状的交点
    pub fn intersection(&self, other: &Shape) -> Vec<Point2> {
        match (self, other) {
            (Shape::Reference(_), _) | (_, Shape::Reference(_)) => vec![],
            (Shape::Point(p), o) | (o, Shape::Point(p)) => {
                if o.distance_to(&p.position) < 1e-6 {
                    vec![p.position]
                } else {
                    vec![]
                }
            }
            (Shape::Line(l1), Shape::Line(l2)) => l1.intersect_line(l2).into_iter().collect(),
            (Shape::Line(line), Shape::Circle(circle))
            | (Shape::Circle(circle), Shape::Line(line)) => line.intersect_circle(circle),
            (Shape::Circle(c1), Shape::Circle(c2)) => c1.intersect_circle(c2),
        }
    }

    /// 同类形状之间的差异度，用于去重
    ///
    /// 不同类型之间返回无穷大。
    pub fn difference(&self, other: &Shape) -> f64 {
        match (self, other) {
            (Shape::Point(a), Shape::Point(b)) => a.distance_to(&b.position),
            (Shape::Line(a), Shape::Line(b)) => a.difference(b),
            (Shape::Circle(a), Shape::Circle(b)) => a.difference(b),
            (Shape::Reference(a), Shape::Reference(b)) => {
                if a.identity == b.identity {
                    0.0
                } else {
                    f64::INFINITY
                }
            }
            _ => f64::INFINITY,
        }
    }
}

/// 点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantPoint {
    pub position: Point2,
}

impl RelevantPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Point2::new(x, y),
        }
    }

    pub fn from_point2(position: Point2) -> Self {
        Self { position }
    }

    pub fn distance_to(&self, point: &Point2) -> f64 {
        (self.position - point).norm()
    }
}

/// 无限直线
///
/// 由原点和单位方向向量表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantLine {
    pub origin: Point2,
    /// 单位方向向量
    pub direction: Vector2,
}

impl RelevantLine {
    /// 创建直线，方向会被归一化；方向长度为零时返回 None
    pub fn new(origin: Point2, direction: Vector2) -> Option<Self> {
        let len = direction.norm();
        if len < EPSILON || !len.is_finite() {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    /// 过两点的直线
    pub fn through(a: Point2, b: Point2) -> Option<Self> {
        Self::new(a, b - a)
    }

    /// 法向量（方向逆时针旋转90°）
    pub fn normal(&self) -> Vector2 {
        Vector2::new(-self.direction.y, self.direction.x)
    }

    /// 计算点到直线的距离
    pub fn distance_to(&self, point: &Point2) -> f64 {
        (point - self.origin).dot(&self.normal()).abs()
    }

    /// 计算点在直线上的投影
    pub fn nearest_point(&self, point: &Point2) -> Point2 {
        let t = (point - self.origin).dot(&self.direction);
        self.origin + self.direction * t
    }

    /// 规范化表示：角度 ∈ [0, π) 与沿法向的偏移
    pub fn canonical(&self) -> (f64, f64) {
        let mut angle = self.direction.y.atan2(self.direction.x);
        if angle < 0.0 {
            angle += PI;
        }
        if angle >= PI {
            angle -= PI;
        }
        let normal = Vector2::new(-angle.sin(), angle.cos());
        (angle, self.origin.coords.dot(&normal))
    }

    /// 与另一条直线的差异度：偏移差 + 加权角度差
    pub fn difference(&self, other: &RelevantLine) -> f64 {
        let (a1, o1) = self.canonical();
        let (a2, mut o2) = other.canonical();

        let mut angle_diff = (a1 - a2).abs();
        if angle_diff > PI / 2.0 {
            // 跨越 0/π 边界时法向翻转
            angle_diff = PI - angle_diff;
            o2 = -o2;
        }

        (o1 - o2).abs() + LINE_ANGLE_WEIGHT * angle_diff
    }

    /// 直线-直线交点
    pub fn intersect_line(&self, other: &RelevantLine) -> Option<Point2> {
        let d1 = self.direction;
        let d2 = other.direction;

        let cross = d1.x * d2.y - d1.y * d2.x;

        // 平行
        if cross.abs() < EPSILON {
            return None;
        }

        let d = other.origin - self.origin;
        let t = (d.x * d2.y - d.y * d2.x) / cross;
        Some(self.origin + d1 * t)
    }

    /// 直线-圆交点
    pub fn intersect_circle(&self, circle: &RelevantCircle) -> Vec<Point2> {
        let d = self.direction;
        let f = self.origin - circle.center;

        let b = 2.0 * f.dot(&d);
        let c = f.dot(&f) - circle.radius * circle.radius;

        let discriminant = b * b - 4.0 * c;

        if discriminant < -EPSILON {
            return vec![];
        }

        if discriminant.abs() < EPSILON {
            // 相切
            let t = -b / 2.0;
            return vec![self.origin + d * t];
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / 2.0;
        let t2 = (-b + sqrt_disc) / 2.0;
        vec![self.origin + d * t1, self.origin + d * t2]
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantCircle {
    pub center: Point2,
    pub radius: f64,
}

impl RelevantCircle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// 过三点的圆，三点共线时返回 None
    pub fn through_three_points(p1: Point2, p2: Point2, p3: Point2) -> Option<Self> {
        let d = 2.0
            * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));

        if d.abs() < EPSILON {
            return None;
        }

        let ux = ((p1.x * p1.x + p1.y * p1.y) * (p2.y - p3.y)
            + (p2.x * p2.x + p2.y * p2.y) * (p3.y - p1.y)
            + (p3.x * p3.x + p3.y * p3.y) * (p1.y - p2.y))
            / d;
        let uy = ((p1.x * p1.x + p1.y * p1.y) * (p3.x - p2.x)
            + (p2.x * p2.x + p2.y * p2.y) * (p1.x - p3.x)
            + (p3.x * p3.x + p3.y * p3.y) * (p2.x - p1.x))
            / d;

        let center = Point2::new(ux, uy);
        let radius = (p1 - center).norm();
        Some(Self::new(center, radius))
    }

    /// 计算点到圆周的距离
    pub fn distance_to(&self, point: &Point2) -> f64 {
        ((point - self.center).norm() - self.radius).abs()
    }

    /// 圆周上离给定点最近的点
    pub fn nearest_point(&self, point: &Point2) -> Point2 {
        let v = point - self.center;
        let len = v.norm();
        if len < EPSILON {
            // 圆心处任意方向都等距
            return self.center + Vector2::new(self.radius, 0.0);
        }
        self.center + v * (self.radius / len)
    }

    /// 圆心距离 + 半径差
    pub fn difference(&self, other: &RelevantCircle) -> f64 {
        (self.center - other.center).norm() + (self.radius - other.radius).abs()
    }

    /// 圆-圆交点
    pub fn intersect_circle(&self, other: &RelevantCircle) -> Vec<Point2> {
        let d = (other.center - self.center).norm();

        // 不相交或同心
        if d > self.radius + other.radius + EPSILON
            || d < (self.radius - other.radius).abs() - EPSILON
            || d < EPSILON
        {
            return vec![];
        }

        let a = (self.radius * self.radius - other.radius * other.radius + d * d) / (2.0 * d);
        let h = (self.radius * self.radius - a * a).max(0.0).sqrt();

        let p = self.center + (other.center - self.center) * (a / d);

        let dir = (other.center - self.center) / d;
        let perp = Vector2::new(-dir.y, dir.x);

        if h < EPSILON {
            vec![p]
        } else {
            vec![p + perp * h, p - perp * h]
        }
    }
}

/// 外部参考记录的锁定包装
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub identity: SeedId,
    pub position: Point2,
}
