//! 按类型分桶的相关对象集合
//!
//! 每个对象类型一个桶，桶内对象ID按时间升序排列。
//! 对象数据存放在竞技场中，所以大部分操作需要传入 [`ObjectArena`]。

use crate::arena::ObjectArena;
use crate::generator::GeneratorId;
use crate::geometry::Shape;
use crate::object::{ObjectId, ObjectKind};
use crate::predicate::SelectionPredicateCollection;

/// 相关对象集合
#[derive(Debug, Clone, Default)]
pub struct RelevantObjectCollection {
    buckets: [Vec<ObjectId>; ObjectKind::COUNT],
}

impl RelevantObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按时间有序插入
    ///
    /// 二分查找插入位置，相同时间的对象保持插入顺序。
    pub fn insert_sorted(&mut self, id: ObjectId, arena: &ObjectArena) {
        let Some(object) = arena.get(id) else {
            return;
        };
        let time = object.time();
        let bucket = &mut self.buckets[object.kind().index()];
        let pos = bucket.partition_point(|other| arena.time_of(*other) <= time);
        bucket.insert(pos, id);
    }

    /// 合并两个集合（逐类型的归并）
    pub fn merge(&self, other: &RelevantObjectCollection, arena: &ObjectArena) -> Self {
        let mut merged = Self::new();
        for kind in ObjectKind::ALL {
            let i = kind.index();
            merged.buckets[i] = merge_sorted(&self.buckets[i], &other.buckets[i], arena);
        }
        merged
    }

    /// 过滤出满足谓词集合的对象
    pub fn subset(
        &self,
        predicates: &SelectionPredicateCollection,
        generator: GeneratorId,
        arena: &ObjectArena,
    ) -> Self {
        let mut subset = Self::new();
        for (i, bucket) in self.buckets.iter().enumerate() {
            subset.buckets[i] = bucket
                .iter()
                .copied()
                .filter(|id| {
                    arena
                        .get(*id)
                        .is_some_and(|obj| predicates.check(obj, generator))
                })
                .collect();
        }
        subset
    }

    /// 在同类型桶中查找第一个差异度不超过 `epsilon` 的对象
    pub fn find_similar(&self, shape: &Shape, epsilon: f64, arena: &ObjectArena) -> Option<ObjectId> {
        self.buckets[shape.kind().index()]
            .iter()
            .copied()
            .find(|id| {
                arena
                    .get(*id)
                    .is_some_and(|obj| obj.difference(shape) <= epsilon)
            })
    }

    /// 查找所有差异度不超过 `epsilon` 的对象（按桶顺序）
    pub fn find_all_similar(&self, shape: &Shape, epsilon: f64, arena: &ObjectArena) -> Vec<ObjectId> {
        self.buckets[shape.kind().index()]
            .iter()
            .copied()
            .filter(|id| {
                arena
                    .get(*id)
                    .is_some_and(|obj| obj.difference(shape) <= epsilon)
            })
            .collect()
    }

    /// 移除对象，不存在时无操作
    pub fn remove(&mut self, id: ObjectId) -> bool {
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.iter().position(|other| *other == id) {
                bucket.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.buckets.iter().any(|bucket| bucket.contains(&id))
    }

    /// 对象总数
    pub fn count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.buckets[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn bucket(&self, kind: ObjectKind) -> &[ObjectId] {
        &self.buckets[kind.index()]
    }

    /// 按类型顺序遍历所有对象ID
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.buckets.iter().flat_map(|bucket| bucket.iter().copied())
    }

    /// 时间变化后重新排序某个桶（稳定排序）
    pub fn resort(&mut self, kind: ObjectKind, arena: &ObjectArena) {
        self.buckets[kind.index()].sort_by(|a, b| arena.time_of(*a).total_cmp(&arena.time_of(*b)));
    }

    /// 检查所有桶是否按时间升序
    pub fn is_sorted(&self, arena: &ObjectArena) -> bool {
        self.buckets.iter().all(|bucket| {
            bucket
                .windows(2)
                .all(|w| arena.time_of(w[0]) <= arena.time_of(w[1]))
        })
    }

    /// 将多个类型的桶按时间归并成一个序列
    pub fn time_ordered(&self, kinds: &[ObjectKind], arena: &ObjectArena) -> Vec<ObjectId> {
        let mut seen = [false; ObjectKind::COUNT];
        let mut result = Vec::new();
        for kind in kinds {
            if std::mem::replace(&mut seen[kind.index()], true) {
                continue;
            }
            result = merge_sorted(&result, &self.buckets[kind.index()], arena);
        }
        result
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

/// 归并两个按时间有序的序列，时间相同时左侧优先
fn merge_sorted(left: &[ObjectId], right: &[ObjectId], arena: &ObjectArena) -> Vec<ObjectId> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if arena.time_of(right[j]) < arena.time_of(left[i]) {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RelevantCircle, RelevantPoint};
    use crate::math::Point2;
    use crate::object::RelevantObject;

    fn add_point(arena: &mut ObjectArena, x: f64, time: f64) -> ObjectId {
        arena.insert(RelevantObject::locked(
            Shape::Point(RelevantPoint::new(x, 0.0)),
            time,
            None,
        ))
    }

    #[test]
    fn test_insert_sorted_keeps_order() {
        let mut arena = ObjectArena::new();
        let mut collection = RelevantObjectCollection::new();
        for t in [3.0, 1.0, 2.0, 1.0, 0.0] {
            let id = add_point(&mut arena, t, t);
            collection.insert_sorted(id, &arena);
        }
        assert!(collection.is_sorted(&arena));
        assert_eq!(collection.count(), 5);
        assert_eq!(collection.count_of(ObjectKind::Point), 5);
        assert_eq!(collection.count_of(ObjectKind::Line), 0);
    }

    #[test]
    fn test_merge() {
        let mut arena = ObjectArena::new();
        let mut a = RelevantObjectCollection::new();
        let mut b = RelevantObjectCollection::new();
        for t in [0.0, 2.0, 4.0] {
            let id = add_point(&mut arena, t, t);
            a.insert_sorted(id, &arena);
        }
        for t in [1.0, 3.0] {
            let id = add_point(&mut arena, t, t);
            b.insert_sorted(id, &arena);
        }
        let merged = a.merge(&b, &arena);
        let times: Vec<f64> = merged
            .bucket(ObjectKind::Point)
            .iter()
            .map(|id| arena.time_of(*id))
            .collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_find_similar_is_kind_restricted() {
        let mut arena = ObjectArena::new();
        let mut collection = RelevantObjectCollection::new();
        let p = add_point(&mut arena, 10.0, 0.0);
        collection.insert_sorted(p, &arena);
        let c = arena.insert(RelevantObject::locked(
            Shape::Circle(RelevantCircle::new(Point2::new(10.0, 0.0), 0.0)),
            0.0,
            None,
        ));
        collection.insert_sorted(c, &arena);

        let probe = Shape::Point(RelevantPoint::new(10.005, 0.0));
        assert_eq!(collection.find_similar(&probe, 0.01, &arena), Some(p));
        assert_eq!(collection.find_similar(&probe, 0.001, &arena), None);

        let probe = Shape::Circle(RelevantCircle::new(Point2::new(10.0, 0.0), 0.005));
        assert_eq!(collection.find_all_similar(&probe, 0.01, &arena), vec![c]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut arena = ObjectArena::new();
        let mut collection = RelevantObjectCollection::new();
        let a = add_point(&mut arena, 0.0, 0.0);
        let b = add_point(&mut arena, 1.0, 1.0);
        collection.insert_sorted(a, &arena);
        assert!(!collection.remove(b));
        assert!(collection.remove(a));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_resort_after_time_change() {
        let mut arena = ObjectArena::new();
        let mut collection = RelevantObjectCollection::new();
        let a = add_point(&mut arena, 0.0, 0.0);
        let b = add_point(&mut arena, 1.0, 1.0);
        collection.insert_sorted(a, &arena);
        collection.insert_sorted(b, &arena);

        arena.get_mut(a).unwrap().time = 5.0;
        assert!(!collection.is_sorted(&arena));
        collection.resort(ObjectKind::Point, &arena);
        assert!(collection.is_sorted(&arena));
        assert_eq!(collection.bucket(ObjectKind::Point), &[b, a]);
    }
}
