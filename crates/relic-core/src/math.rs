//! 数学基础类型
//!
//! 基于 nalgebra 的二维点、向量与相似变换别名。

/// 二维点
pub type Point2 = nalgebra::Point2<f64>;

/// 二维向量
pub type Vector2 = nalgebra::Vector2<f64>;

/// 世界坐标到屏幕坐标的变换（平移 + 旋转 + 均匀缩放）
pub type Transform = nalgebra::Similarity2<f64>;

/// 几何计算容差
pub const EPSILON: f64 = 1e-9;

/// 判断点的两个分量是否都是有限值
pub fn is_finite_point(p: &Point2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// 多个点的平均位置
pub fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords);
    Some(Point2::from(sum / points.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid() {
        let c = centroid(&[Point2::new(0.0, 0.0), Point2::new(4.0, 2.0)]).unwrap();
        assert!((c.x - 2.0).abs() < EPSILON);
        assert!((c.y - 1.0).abs() < EPSILON);
        assert!(centroid(&[]).is_none());
    }
}
