//! 绘制接口
//!
//! 引擎本身不做光栅化，只把可绘制对象变换到屏幕坐标后交给外部画布。

use crate::geometry::Shape;
use crate::layers::LayerCollection;
use crate::math::{Point2, Transform, Vector2};
use crate::object::RelevantObject;
use crate::snap::KindMask;
use serde::{Deserialize, Serialize};

/// RGBA 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const GRAY: Color = Color::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// 绘制样式
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawStyle {
    pub color: Color,
    /// 线宽（屏幕像素）
    pub thickness: f32,
    pub dashed: bool,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            color: Color::GRAY,
            thickness: 1.0,
            dashed: false,
        }
    }
}

/// 外部画布，坐标均为屏幕坐标
pub trait Canvas {
    fn draw_point(&mut self, position: Point2, style: &DrawStyle);

    /// 无限直线，`direction` 为单位向量
    fn draw_infinite_line(&mut self, origin: Point2, direction: Vector2, style: &DrawStyle);

    fn draw_circle(&mut self, center: Point2, radius: f64, style: &DrawStyle);
}

impl RelevantObject {
    /// 用 `transform` 把对象变换到屏幕坐标并绘制；不可绘制的对象被忽略
    pub fn draw(&self, canvas: &mut dyn Canvas, transform: &Transform, style: &DrawStyle) {
        match self.shape() {
            Shape::Point(p) => canvas.draw_point(transform.transform_point(&p.position), style),
            Shape::Line(l) => {
                let direction = transform.transform_vector(&l.direction);
                let norm = direction.norm();
                if norm > 0.0 {
                    canvas.draw_infinite_line(transform.transform_point(&l.origin), direction / norm, style);
                }
            }
            Shape::Circle(c) => canvas.draw_circle(
                transform.transform_point(&c.center),
                c.radius * transform.scaling(),
                style,
            ),
            Shape::Reference(_) => {}
        }
    }
}

impl LayerCollection {
    /// 按图层顺序绘制所有可绘制对象，样式由 `style_fn` 决定
    pub fn draw_all<F>(&self, canvas: &mut dyn Canvas, transform: &Transform, mut style_fn: F)
    where
        F: FnMut(&RelevantObject) -> DrawStyle,
    {
        for id in self.get_all_drawables(KindMask::ALL) {
            if let Some(object) = self.arena.get(id) {
                let style = style_fn(object);
                object.draw(canvas, transform, &style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::generator::GeneratorSet;
    use crate::generators::{CircleThroughPointsGenerator, LineThroughPointsGenerator};
    use crate::math::EPSILON;
    use crate::seed::SeedRecord;

    #[derive(Default)]
    struct RecordingCanvas {
        points: Vec<Point2>,
        lines: Vec<(Point2, Vector2)>,
        circles: Vec<(Point2, f64)>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_point(&mut self, position: Point2, _style: &DrawStyle) {
            self.points.push(position);
        }

        fn draw_infinite_line(&mut self, origin: Point2, direction: Vector2, _style: &DrawStyle) {
            self.lines.push((origin, direction));
        }

        fn draw_circle(&mut self, center: Point2, radius: f64, _style: &DrawStyle) {
            self.circles.push((center, radius));
        }
    }

    #[test]
    fn test_draw_all_applies_transform() {
        let mut generators = GeneratorSet::new();
        generators.register(LineThroughPointsGenerator);
        generators.register(CircleThroughPointsGenerator);
        let config = EngineConfig {
            inception_level: 1,
            ..Default::default()
        };
        let seeds = [
            SeedRecord::point(1, 0.0, 0.0, 0.0),
            SeedRecord::point(2, 1.0, 10.0, 0.0),
            SeedRecord::point(3, 2.0, 0.0, 10.0),
        ];
        let (c, _) = LayerCollection::with_seeds(config, generators, &seeds).unwrap();

        let transform = Transform::new(Vector2::new(5.0, 5.0), 0.0, 2.0);
        let mut canvas = RecordingCanvas::default();
        let mut styled = 0;
        c.draw_all(&mut canvas, &transform, |_| {
            styled += 1;
            DrawStyle::default()
        });

        assert_eq!(canvas.points.len(), 3);
        assert_eq!(canvas.lines.len(), 2);
        assert_eq!(canvas.circles.len(), 1);
        assert_eq!(styled, 6);

        assert!((canvas.points[0] - Point2::new(5.0, 5.0)).norm() < EPSILON);
        for (_, direction) in &canvas.lines {
            assert!((direction.norm() - 1.0).abs() < EPSILON);
        }
        // 外接圆半径 5√2，放大两倍
        let (_, radius) = canvas.circles[0];
        assert!((radius - 10.0 * 2.0_f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_color_array() {
        let c = Color::WHITE.with_alpha(0);
        assert_eq!(c.to_f32_array(), [1.0, 1.0, 1.0, 0.0]);
    }
}
