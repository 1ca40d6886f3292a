//! 生成过程
//!
//! 以某层（深度生成器还包括更浅的层）为输入，让下一层与当前输入保持一致：
//! 1. 枚举所有启用生成器的合法输入组合
//! 2. 下一层对象中不再合法的父组被撤销，失去全部父组的对象被级联释放
//! 3. 尚未执行过的组合执行变换，单个组合的失败（错误或 panic）被隔离并计数
//! 4. 候选对象在下一层中按容差查找相似对象：找到则合并父组，否则插入新对象
//!
//! 组合按 (父对象时间升序, 生成器注册顺序) 排序后处理，去重结果是确定的。
//! 某层的变化（插入、释放、时间顺序、选中或锁定状态）之后，从该层起逐层重新对齐。

use crate::collection::RelevantObjectCollection;
use crate::error::GeneratorFault;
use crate::generator::{GeneratorSettings, Role};
use crate::geometry::Shape;
use crate::layer::GenerationReport;
use crate::layers::LayerCollection;
use crate::object::{LayerId, ObjectId, ParentGroup, RelevantObject};
use crate::selection::{enumerate_assignments, AssignmentQuery};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// 一个待执行的输入组合
struct Job {
    group: ParentGroup,
    /// 按角色顺序排列的输入
    inputs: Vec<ObjectId>,
    /// 父对象时间（升序），排序键
    times: Vec<f64>,
}

fn compare_jobs(a: &Job, b: &Job) -> Ordering {
    for (ta, tb) in a.times.iter().zip(&b.times) {
        match ta.total_cmp(tb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.times
        .len()
        .cmp(&b.times.len())
        .then(a.group.generator.cmp(&b.group.generator))
}

/// 相邻的相同角色可以互换，组内按ID排序
fn canonical_inputs(roles: &[Role], inputs: &[ObjectId]) -> Vec<ObjectId> {
    let mut canonical = inputs.to_vec();
    let len = roles.len().min(canonical.len());
    let mut run = 0;
    for end in 1..=len {
        if end == len || roles[end] != roles[run] {
            canonical[run..end].sort();
            run = end;
        }
    }
    canonical
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl LayerCollection {
    /// 从 `start` 层起逐层重新对齐生成结果，直到最深层
    pub(crate) fn reconcile(&mut self, start: LayerId) -> GenerationReport {
        let mut report = GenerationReport::default();
        for layer in start..self.inception_level() {
            self.generate_layer(layer, &mut report);
        }
        if !report.is_empty() {
            tracing::debug!(
                "Reconciled from layer {}: {} created, {} merged, {} disposed, {} faults",
                start,
                report.created,
                report.merged,
                report.disposed,
                report.faults
            );
        }
        report
    }

    /// 以 `layer` 为输入对齐 `layer + 1`
    ///
    /// 空的目标层等价于一次完整生成。
    pub(crate) fn generate_layer(&mut self, layer: LayerId, report: &mut GenerationReport) {
        let target = layer + 1;
        if target >= self.layers.len() {
            return;
        }

        let jobs = self.collect_jobs(layer);
        let valid: BTreeSet<ParentGroup> = jobs.iter().map(|job| job.group.clone()).collect();
        self.layers[target].spent.retain(|group| valid.contains(group));
        self.retire_groups(target, &valid, report);

        let recorded: BTreeSet<ParentGroup> = self.layers[target]
            .collection
            .iter()
            .filter_map(|id| self.arena.get(id))
            .flat_map(|object| object.parent_groups.iter().cloned())
            .collect();

        for job in jobs {
            if recorded.contains(&job.group) || self.layers[target].spent.contains(&job.group) {
                continue;
            }
            if !self.run_job(target, &job, report) {
                self.layers[target].spent.insert(job.group);
            }
        }
    }

    /// 枚举以 `layer` 为输入的所有合法组合，按处理顺序排列
    fn collect_jobs(&self, layer: LayerId) -> Vec<Job> {
        let mut jobs = Vec::new();
        for (generator, _, settings) in self.generators.iter_active() {
            let roles = self.generators.roles(generator);

            let pool: Cow<'_, RelevantObjectCollection> = if settings.is_deep {
                let mut merged = self.layers[0].collection.clone();
                for depth in 1..=layer {
                    merged = merged.merge(&self.layers[depth].collection, &self.arena);
                }
                Cow::Owned(merged)
            } else {
                Cow::Borrowed(&self.layers[layer].collection)
            };

            let query = AssignmentQuery {
                generator,
                roles: &roles,
                pool: &pool,
                sequential: settings.is_sequential,
            };

            let arena = &self.arena;
            // 深度生成器的组合至少包含一个本层对象
            let assignments = enumerate_assignments(&query, arena, |inputs| {
                !settings.is_deep
                    || inputs
                        .iter()
                        .any(|id| arena.get(*id).is_some_and(|o| o.layer() == layer))
            });

            for inputs in assignments {
                let mut times: Vec<f64> = inputs.iter().map(|id| arena.time_of(*id)).collect();
                times.sort_by(f64::total_cmp);
                jobs.push(Job {
                    group: ParentGroup {
                        generator,
                        inputs: canonical_inputs(&roles, &inputs),
                    },
                    inputs,
                    times,
                });
            }
        }

        jobs.sort_by(compare_jobs);
        jobs
    }

    /// 撤销 `target` 层对象中不在 `valid` 里的父组
    fn retire_groups(&mut self, target: LayerId, valid: &BTreeSet<ParentGroup>, report: &mut GenerationReport) {
        let ids: Vec<ObjectId> = self.layers[target].collection.iter().collect();
        let mut changed = Vec::new();

        for id in ids {
            let Some(object) = self.arena.get_mut(id) else {
                continue;
            };
            if object.is_locked || object.parent_groups.iter().all(|g| valid.contains(g)) {
                continue;
            }

            let lost = object.retain_groups(|g| valid.contains(g));
            let orphaned = object.parent_groups.is_empty();
            for parent in lost {
                if let Some(p) = self.arena.get_mut(parent) {
                    p.child_objects.remove(&id);
                }
            }

            if orphaned {
                report.disposed += self.dispose_cascade(id);
            } else {
                changed.push(id);
            }
        }

        self.settle(&changed, true);
    }

    /// 执行一个组合，返回是否有产物记录了它
    fn run_job(&mut self, target: LayerId, job: &Job, report: &mut GenerationReport) -> bool {
        let Some(generator) = self.generators.shared(job.group.generator) else {
            return false;
        };
        let Some(settings) = self.generators.settings(job.group.generator).cloned() else {
            return false;
        };

        let inputs: Vec<&RelevantObject> = job
            .inputs
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .collect();
        if inputs.len() != job.inputs.len() {
            return false;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| generator.apply(&inputs)))
            .unwrap_or_else(|payload| Err(GeneratorFault::Panicked(panic_message(payload.as_ref()))));
        drop(inputs);

        let shapes = match outcome {
            Ok(shapes) => shapes,
            Err(fault) => {
                tracing::warn!(
                    "Generator {} failed on {} inputs: {}",
                    generator.name(),
                    job.inputs.len(),
                    fault
                );
                report.faults += 1;
                return false;
            }
        };

        let mut recorded = false;
        for shape in shapes {
            if !shape.is_finite() {
                tracing::warn!(
                    "Generator {} failed: {}",
                    generator.name(),
                    GeneratorFault::NonFinite
                );
                report.faults += 1;
                continue;
            }
            recorded |= self.place_candidate(target, shape, &settings, &job.group, report);
        }
        recorded
    }

    /// 放置一个候选对象：合并到相似对象，或作为新对象插入
    ///
    /// 返回父组是否被记录到某个对象上。
    fn place_candidate(
        &mut self,
        target: LayerId,
        shape: Shape,
        settings: &GeneratorSettings,
        group: &ParentGroup,
        report: &mut GenerationReport,
    ) -> bool {
        let similar = self.layers[target].collection.find_all_similar(
            &shape,
            self.config.acceptable_difference,
            &self.arena,
        );

        if similar.len() > 1 {
            tracing::warn!(
                "{} {} objects in layer {} are within tolerance of a candidate, merging into the earliest",
                similar.len(),
                shape.kind().name(),
                target
            );
            report.ambiguities += 1;
        }

        if let Some(&existing) = similar.first() {
            report.merged += 1;
            return self.merge_parents(existing, group);
        }

        let mut object = RelevantObject::derived(
            shape,
            group.generator,
            settings.relevancy_ratio,
            settings.generates_inheritable,
        );
        object.layer = target;
        object.add_parent_group(group.clone());

        let id = self.arena.insert(object);
        for parent in &group.inputs {
            if let Some(p) = self.arena.get_mut(*parent) {
                p.child_objects.insert(id);
            }
        }
        self.recompute(id);
        self.layers[target].collection.insert_sorted(id, &self.arena);
        report.created += 1;
        true
    }

    /// 把一个输入组合作为新的父组合并到已有对象，返回父组是否已记录
    fn merge_parents(&mut self, existing: ObjectId, group: &ParentGroup) -> bool {
        let Some(object) = self.arena.get_mut(existing) else {
            return false;
        };
        // 锁定过的对象不再接受父组
        if object.is_locked || object.parent_groups.is_empty() {
            return false;
        }
        if object.parent_groups.contains(group) {
            return true;
        }
        object.add_parent_group(group.clone());

        for parent in &group.inputs {
            if let Some(p) = self.arena.get_mut(*parent) {
                p.child_objects.insert(existing);
            }
        }
        self.settle(&[existing], true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use crate::predicate::SelectionPredicateCollection;

    fn role(kind: ObjectKind) -> Role {
        Role {
            kind,
            predicates: SelectionPredicateCollection::new(),
        }
    }

    #[test]
    fn test_canonical_inputs_sorts_identical_runs() {
        let ids: Vec<ObjectId> = (0..4).map(|index| ObjectId { index, generation: 0 }).collect();
        let roles = [
            role(ObjectKind::Point),
            role(ObjectKind::Point),
            role(ObjectKind::Line),
            role(ObjectKind::Point),
        ];

        let canonical = canonical_inputs(&roles, &[ids[1], ids[0], ids[3], ids[2]]);
        assert_eq!(canonical, vec![ids[0], ids[1], ids[3], ids[2]]);
        assert_eq!(canonical_inputs(&roles, &canonical), canonical);
    }
}
