//! 对象竞技场
//!
//! 以索引寻址的槽位存储，父子链接保存为ID集合，
//! 释放对象即使其ID失效，不存在引用计数环。

use crate::object::{ObjectId, RelevantObject};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    object: Option<RelevantObject>,
}

/// 相关对象竞技场
#[derive(Debug, Clone, Default)]
pub struct ObjectArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_serial: u64,
    len: usize,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入对象，分配ID和插入序号
    pub fn insert(&mut self, mut object: RelevantObject) -> ObjectId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    object: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = ObjectId {
            index,
            generation: slot.generation,
        };

        object.id = id;
        object.serial = self.next_serial;
        object.disposed = false;
        self.next_serial += 1;

        slot.object = Some(object);
        self.len += 1;
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&RelevantObject> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut RelevantObject> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_mut())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// 移除对象并回收槽位，返回的对象标记为已释放
    pub fn remove(&mut self, id: ObjectId) -> Option<RelevantObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let mut object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        object.disposed = true;
        Some(object)
    }

    /// 对象时间，ID无效时为 NaN
    pub fn time_of(&self, id: ObjectId) -> f64 {
        self.get(id).map_or(f64::NAN, |o| o.time)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelevantObject> {
        self.slots.iter().filter_map(|slot| slot.object.as_ref())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RelevantPoint, Shape};

    fn point(x: f64) -> RelevantObject {
        RelevantObject::locked(Shape::Point(RelevantPoint::new(x, 0.0)), x, None)
    }

    #[test]
    fn test_stale_id_after_reuse() {
        let mut arena = ObjectArena::new();
        let a = arena.insert(point(1.0));
        let removed = arena.remove(a).unwrap();
        assert!(removed.is_disposed());

        let b = arena.insert(point(2.0));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().time(), 2.0);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_serials_increase() {
        let mut arena = ObjectArena::new();
        let a = arena.insert(point(1.0));
        let b = arena.insert(point(2.0));
        assert!(arena.get(a).unwrap().serial() < arena.get(b).unwrap().serial());
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
    }
}
