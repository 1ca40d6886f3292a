//! 属性传播与释放
//!
//! 非锁定对象的属性由父对象决定：
//! - 时间 = 父对象时间的平均值
//! - 相关度 = 相关度系数 × 父对象相关度的最大值
//! - 可继承对象的选中状态 = 任一父对象被选中
//!
//! 外部修改一个对象后，受影响的后代按拓扑顺序各重新计算一次，
//! 菱形依赖的公共子对象在其所有受影响父对象都完成之后才计算。
//! 释放是完整的同步操作：返回前所有父子链接都已解除。
//!
//! 改变输入合法性的修改（时间顺序、选中、锁定、相关度、释放）之后，
//! 从对象所在层起重新对齐生成结果。

use crate::error::{ConfigurationError, EngineError, Result};
use crate::layer::GenerationReport;
use crate::layers::LayerCollection;
use crate::object::{LayerId, ObjectId, ObjectKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

impl LayerCollection {
    /// 根据父对象重新计算对象的属性，返回时间是否变化
    ///
    /// 锁定对象和没有父对象的对象保持不变。
    pub(crate) fn recompute(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.arena.get(id) else {
            return false;
        };
        if object.is_locked || object.parent_objects.is_empty() {
            return false;
        }

        let mut time_sum = 0.0;
        let mut max_relevancy: f64 = 0.0;
        let mut any_selected = false;
        let mut count = 0;
        for parent in object.parent_objects.iter().filter_map(|p| self.arena.get(*p)) {
            time_sum += parent.time;
            max_relevancy = max_relevancy.max(parent.relevancy);
            any_selected |= parent.is_selected;
            count += 1;
        }
        if count == 0 {
            return false;
        }

        let time = time_sum / count as f64;
        let relevancy = (object.relevancy_ratio * max_relevancy).clamp(0.0, 1.0);

        let Some(object) = self.arena.get_mut(id) else {
            return false;
        };
        let time_changed = object.time != time;
        object.time = time;
        object.relevancy = relevancy;
        if object.is_inheritable {
            object.is_selected = any_selected;
        }
        time_changed
    }

    /// 从 `roots` 出发按拓扑顺序更新所有后代
    ///
    /// `include_roots` 为 true 时根对象本身也根据父对象重新计算。
    pub(crate) fn settle(&mut self, roots: &[ObjectId], include_roots: bool) {
        let roots: BTreeSet<ObjectId> = roots
            .iter()
            .copied()
            .filter(|id| self.arena.contains(*id))
            .collect();
        if roots.is_empty() {
            return;
        }

        // 收集受影响的子图，锁定对象不参与传播
        let mut affected = roots.clone();
        let mut stack: Vec<ObjectId> = roots.iter().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(object) = self.arena.get(id) else {
                continue;
            };
            for child in &object.child_objects {
                let unlocked = self.arena.get(*child).is_some_and(|c| !c.is_locked);
                if unlocked && affected.insert(*child) {
                    stack.push(*child);
                }
            }
        }

        let mut pending: BTreeMap<ObjectId, usize> = affected
            .iter()
            .map(|id| {
                let count = self.arena.get(*id).map_or(0, |o| {
                    o.parent_objects.iter().filter(|p| affected.contains(p)).count()
                });
                (*id, count)
            })
            .collect();

        let mut queue: VecDeque<ObjectId> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut touched: BTreeSet<(LayerId, ObjectKind)> = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if (include_roots || !roots.contains(&id)) && self.recompute(id) {
                if let Some(object) = self.arena.get(id) {
                    touched.insert((object.layer, object.kind()));
                }
            }

            let children: Vec<ObjectId> = self
                .arena
                .get(id)
                .map(|o| o.child_objects.iter().copied().collect())
                .unwrap_or_default();
            for child in children {
                if let Some(count) = pending.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        for (layer, kind) in touched {
            if let Some(layer) = self.layers.get_mut(layer) {
                layer.collection.resort(kind, &self.arena);
            }
        }
    }

    /// 直接设置时间并传播，不做校验
    pub(crate) fn assign_time(&mut self, id: ObjectId, time: f64) {
        let Some(object) = self.arena.get_mut(id) else {
            return;
        };
        if object.time == time {
            return;
        }
        object.time = time;
        let (layer, kind) = (object.layer, object.kind());
        if let Some(layer) = self.layers.get_mut(layer) {
            layer.collection.resort(kind, &self.arena);
        }
        self.settle(&[id], false);
    }

    /// 设置对象时间，非锁定的后代随之更新
    ///
    /// 有顺序生成器时，时间顺序的变化会撤销和补充相应的产物。
    pub fn set_time(&mut self, id: ObjectId, time: f64) -> Result<GenerationReport> {
        if !time.is_finite() {
            return Err(ConfigurationError::InvalidTime(time).into());
        }
        let layer = self.layer_of(id)?;
        self.assign_time(id, time);
        Ok(self.reconcile_if(self.generators.has_sequential(), layer))
    }

    /// 设置对象相关度，非锁定的后代随之更新
    pub fn set_relevancy(&mut self, id: ObjectId, relevancy: f64) -> Result<GenerationReport> {
        if !(0.0..=1.0).contains(&relevancy) {
            return Err(ConfigurationError::InvalidRelevancy(relevancy).into());
        }
        let object = self.arena.get_mut(id).ok_or(EngineError::UnknownObject(id))?;
        if object.relevancy == relevancy {
            return Ok(GenerationReport::default());
        }
        object.relevancy = relevancy;
        let layer = object.layer;
        self.settle(&[id], false);
        Ok(self.reconcile_if(self.generators.has_role_predicates(), layer))
    }

    /// 设置选中状态，可继承的后代随之更新
    pub fn set_selected(&mut self, id: ObjectId, selected: bool) -> Result<GenerationReport> {
        let object = self.arena.get_mut(id).ok_or(EngineError::UnknownObject(id))?;
        if object.is_selected == selected {
            return Ok(GenerationReport::default());
        }
        object.is_selected = selected;
        let layer = object.layer;
        self.settle(&[id], false);
        Ok(self.reconcile_if(self.generators.has_role_predicates(), layer))
    }

    /// 锁定或解锁对象
    ///
    /// 锁定会解除与所有父对象的链接，之后父对象的变化不再影响它；
    /// 子对象保持不变。解锁不会恢复父链接。
    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> Result<GenerationReport> {
        let object = self.arena.get_mut(id).ok_or(EngineError::UnknownObject(id))?;
        if object.is_locked == locked {
            return Ok(GenerationReport::default());
        }
        object.is_locked = locked;
        let layer = object.layer;

        if locked {
            let parents = std::mem::take(&mut object.parent_objects);
            let groups = std::mem::take(&mut object.parent_groups);
            for parent in parents {
                if let Some(p) = self.arena.get_mut(parent) {
                    p.child_objects.remove(&id);
                }
            }
            // 产生它的组合不再执行
            if let Some(l) = self.layers.get_mut(layer) {
                l.spent.extend(groups);
            }
            tracing::debug!("Locked {} and detached it from its parents", id);
        }

        Ok(self.reconcile_if(self.generators.has_role_predicates(), layer))
    }

    fn layer_of(&self, id: ObjectId) -> Result<LayerId> {
        self.arena
            .get(id)
            .map(|object| object.layer)
            .ok_or(EngineError::UnknownObject(id))
    }

    fn reconcile_if(&mut self, needed: bool, layer: LayerId) -> GenerationReport {
        if needed {
            self.reconcile(layer)
        } else {
            GenerationReport::default()
        }
    }

    /// 释放对象
    ///
    /// 解除与所有父、子对象的链接并从所在层移除。
    /// 失去全部父组合的非锁定子对象被级联释放；仍有父组合的子对象重新计算属性。
    /// 产生该对象的组合不会再次执行。
    /// 返回释放的对象总数，ID 不存在时为 0。
    pub fn dispose(&mut self, id: ObjectId) -> usize {
        let Some(object) = self.arena.get(id) else {
            return 0;
        };
        let layer = object.layer;
        let groups = object.parent_groups.clone();
        if let Some(l) = self.layers.get_mut(layer) {
            l.spent.extend(groups);
        }

        let disposed = self.dispose_cascade(id);
        disposed + self.reconcile(layer).disposed
    }

    /// 释放对象及失去全部父组合的后代，不重新对齐生成结果
    pub(crate) fn dispose_cascade(&mut self, id: ObjectId) -> usize {
        let mut queue = VecDeque::from([id]);
        let mut survivors = BTreeSet::new();
        let mut disposed = 0;

        while let Some(current) = queue.pop_front() {
            let Some(object) = self.arena.remove(current) else {
                continue;
            };
            if let Some(layer) = self.layers.get_mut(object.layer) {
                layer.collection.remove(current);
            }

            for parent in &object.parent_objects {
                if let Some(p) = self.arena.get_mut(*parent) {
                    p.child_objects.remove(&current);
                }
            }

            for child in &object.child_objects {
                let Some(c) = self.arena.get_mut(*child) else {
                    continue;
                };
                let lost = c.drop_parent(current);
                let orphaned = c.parent_objects.is_empty() && !c.is_locked;
                for parent in lost {
                    if let Some(p) = self.arena.get_mut(parent) {
                        p.child_objects.remove(child);
                    }
                }
                if orphaned {
                    queue.push_back(*child);
                } else {
                    survivors.insert(*child);
                }
            }
            disposed += 1;
        }

        let survivors: Vec<ObjectId> = survivors
            .into_iter()
            .filter(|id| self.arena.contains(*id))
            .collect();
        self.settle(&survivors, true);

        if disposed > 1 {
            tracing::debug!("Disposed {} and {} dependent objects", id, disposed - 1);
        }
        disposed
    }
}
