//! 内置生成器
//!
//! 常用的推导规则。几何上退化的输入（重合点、共线点、平行线）
//! 不产生任何对象，但不算作失败。

use crate::error::GeneratorFault;
use crate::generator::{Generator, GeneratorSettings};
use crate::geometry::{RelevantCircle, RelevantLine, RelevantPoint, Shape};
use crate::math::{centroid, Point2};
use crate::object::{ObjectKind, RelevantObject};

fn check_arity(inputs: &[&RelevantObject], expected: usize) -> Result<(), GeneratorFault> {
    if inputs.len() != expected {
        return Err(GeneratorFault::WrongArity {
            expected,
            found: inputs.len(),
        });
    }
    Ok(())
}

fn point_inputs<const N: usize>(inputs: &[&RelevantObject]) -> Result<[Point2; N], GeneratorFault> {
    check_arity(inputs, N)?;
    let mut points = [Point2::origin(); N];
    for (slot, input) in inputs.iter().enumerate() {
        match input.shape() {
            Shape::Point(p) => points[slot] = p.position,
            _ => return Err(GeneratorFault::WrongKind { slot }),
        }
    }
    Ok(points)
}

/// 两点的中点
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointGenerator;

impl Generator for MidpointGenerator {
    fn name(&self) -> &str {
        "Midpoint"
    }

    fn description(&self) -> &str {
        "Point halfway between two points"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point, ObjectKind::Point]
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        let points = point_inputs::<2>(inputs)?;
        Ok(centroid(&points)
            .map(|c| Shape::Point(RelevantPoint::from_point2(c)))
            .into_iter()
            .collect())
    }
}

/// 过两点的直线
#[derive(Debug, Clone, Copy, Default)]
pub struct LineThroughPointsGenerator;

impl Generator for LineThroughPointsGenerator {
    fn name(&self) -> &str {
        "Line through points"
    }

    fn description(&self) -> &str {
        "Infinite line through two points"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point, ObjectKind::Point]
    }

    fn default_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            is_sequential: true,
            ..Default::default()
        }
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        let [a, b] = point_inputs::<2>(inputs)?;
        Ok(RelevantLine::through(a, b).map(Shape::Line).into_iter().collect())
    }
}

/// 过三点的圆
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleThroughPointsGenerator;

impl Generator for CircleThroughPointsGenerator {
    fn name(&self) -> &str {
        "Circle through points"
    }

    fn description(&self) -> &str {
        "Circle through three non-collinear points"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point, ObjectKind::Point, ObjectKind::Point]
    }

    fn default_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            is_sequential: true,
            relevancy_ratio: 0.8,
            ..Default::default()
        }
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        let [a, b, c] = point_inputs::<3>(inputs)?;
        Ok(RelevantCircle::through_three_points(a, b, c)
            .map(Shape::Circle)
            .into_iter()
            .collect())
    }
}

/// 两条直线的交点
#[derive(Debug, Clone, Copy, Default)]
pub struct LineIntersectionGenerator;

impl Generator for LineIntersectionGenerator {
    fn name(&self) -> &str {
        "Line intersection"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Line, ObjectKind::Line]
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        check_arity(inputs, 2)?;
        match (inputs[0].shape(), inputs[1].shape()) {
            (Shape::Line(a), Shape::Line(b)) => Ok(a
                .intersect_line(b)
                .map(|p| Shape::Point(RelevantPoint::from_point2(p)))
                .into_iter()
                .collect()),
            (Shape::Line(_), _) => Err(GeneratorFault::WrongKind { slot: 1 }),
            _ => Err(GeneratorFault::WrongKind { slot: 0 }),
        }
    }
}

/// 圆的圆心
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleCenterGenerator;

impl Generator for CircleCenterGenerator {
    fn name(&self) -> &str {
        "Circle center"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Circle]
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        check_arity(inputs, 1)?;
        match inputs[0].shape() {
            Shape::Circle(c) => Ok(vec![Shape::Point(RelevantPoint::from_point2(c.center))]),
            _ => Err(GeneratorFault::WrongKind { slot: 0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(x: f64, y: f64) -> RelevantObject {
        RelevantObject::locked(Shape::Point(RelevantPoint::new(x, y)), 0.0, None)
    }

    #[test]
    fn test_midpoint() {
        let (a, b) = (seed(0.0, 0.0), seed(4.0, 2.0));
        let out = MidpointGenerator.apply(&[&a, &b]).unwrap();
        assert_eq!(out, vec![Shape::Point(RelevantPoint::new(2.0, 1.0))]);
    }

    #[test]
    fn test_wrong_arity_is_fault() {
        let a = seed(0.0, 0.0);
        assert_eq!(
            MidpointGenerator.apply(&[&a]),
            Err(GeneratorFault::WrongArity { expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_degenerate_inputs_produce_nothing() {
        let (a, b, c) = (seed(0.0, 0.0), seed(1.0, 1.0), seed(2.0, 2.0));
        assert!(LineThroughPointsGenerator.apply(&[&a, &a]).unwrap().is_empty());
        assert!(CircleThroughPointsGenerator.apply(&[&a, &b, &c]).unwrap().is_empty());
    }

    #[test]
    fn test_line_intersection_and_center() {
        let l1 = RelevantObject::locked(
            Shape::Line(RelevantLine::through(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)).unwrap()),
            0.0,
            None,
        );
        let l2 = RelevantObject::locked(
            Shape::Line(RelevantLine::through(Point2::new(0.0, 2.0), Point2::new(2.0, 0.0)).unwrap()),
            0.0,
            None,
        );
        let out = LineIntersectionGenerator.apply(&[&l1, &l2]).unwrap();
        match &out[..] {
            [Shape::Point(p)] => {
                assert!((p.position.x - 1.0).abs() < 1e-9);
                assert!((p.position.y - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected output {:?}", other),
        }

        let circle = RelevantObject::locked(
            Shape::Circle(RelevantCircle::new(Point2::new(3.0, 4.0), 2.0)),
            0.0,
            None,
        );
        assert_eq!(
            CircleCenterGenerator.apply(&[&circle]).unwrap(),
            vec![Shape::Point(RelevantPoint::new(3.0, 4.0))]
        );
        assert_eq!(
            CircleCenterGenerator.apply(&[&l1]),
            Err(GeneratorFault::WrongKind { slot: 0 })
        );
    }
}
