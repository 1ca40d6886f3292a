//! 图层集合与推导深度管理
//!
//! [`LayerCollection`] 持有对象竞技场、全部图层和生成器集合，是推导图的唯一写入者。
//! - 第 0 层：锁定种子
//! - 第 1..=n 层：生成层，n 为推导深度（inception level）
//!
//! 生成、传播和释放的实现分别位于 `generation`、`propagation` 模块。

use crate::arena::ObjectArena;
use crate::config::{validate_acceptable_difference, EngineConfig, Preferences};
use crate::error::{ConfigurationError, EngineError, Result};
use crate::generator::{GeneratorId, GeneratorSet, GeneratorSettings};
use crate::layer::{GenerationReport, RelevantObjectLayer};
use crate::object::{LayerId, ObjectId, ObjectKind, RelevantObject, SeedId};
use crate::seed::SeedRecord;
use crate::snap::KindMask;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// 单层统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerStats {
    pub depth: LayerId,
    /// 按 [`ObjectKind::index`] 排列的数量
    pub counts: [usize; ObjectKind::COUNT],
}

impl LayerStats {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.counts[kind.index()]
    }
}

/// 图层集合
#[derive(Debug, Clone)]
pub struct LayerCollection {
    pub(crate) arena: ObjectArena,
    pub(crate) layers: Vec<RelevantObjectLayer>,
    pub(crate) generators: GeneratorSet,
    pub(crate) config: EngineConfig,
}

impl LayerCollection {
    /// 创建只有种子层的集合
    ///
    /// `config.inception_level` 记录目标深度，生成层在种子插入后通过
    /// [`set_inception_level`](Self::set_inception_level) 建立。
    pub fn new(config: EngineConfig, generators: GeneratorSet) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            arena: ObjectArena::new(),
            layers: vec![RelevantObjectLayer::new(0, None)],
            generators,
            config: EngineConfig {
                inception_level: 0,
                ..config
            },
        })
    }

    /// 创建集合、插入种子并生成到配置的深度
    pub fn with_seeds(
        config: EngineConfig,
        generators: GeneratorSet,
        seeds: &[SeedRecord],
    ) -> Result<(Self, GenerationReport)> {
        let level = config.inception_level;
        let mut collection = Self::new(config, generators)?;
        let mut report = collection.seed(seeds);
        report.absorb(collection.set_inception_level(level as i64)?);
        Ok((collection, report))
    }

    // ========== 访问 ==========

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generators(&self) -> &GeneratorSet {
        &self.generators
    }

    pub fn arena(&self) -> &ObjectArena {
        &self.arena
    }

    pub fn object(&self, id: ObjectId) -> Option<&RelevantObject> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.arena.contains(id)
    }

    pub fn layer(&self, depth: LayerId) -> Option<&RelevantObjectLayer> {
        self.layers.get(depth)
    }

    /// 图层数（含种子层）
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// 当前推导深度
    pub fn inception_level(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn layers(&self) -> impl Iterator<Item = &RelevantObjectLayer> {
        self.layers.iter()
    }

    /// 所有对象，按图层顺序
    pub fn get_all_objects(&self) -> Vec<ObjectId> {
        self.layers
            .iter()
            .flat_map(|layer| layer.collection.iter())
            .collect()
    }

    /// 所有可绘制对象，按图层顺序，`mask` 过滤类型
    pub fn get_all_drawables(&self, mask: KindMask) -> Vec<ObjectId> {
        self.layers
            .iter()
            .flat_map(|layer| {
                ObjectKind::ALL
                    .into_iter()
                    .filter(|kind| kind.is_drawable() && mask.is_enabled(*kind))
                    .flat_map(move |kind| layer.collection.bucket(kind).iter().copied())
            })
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.arena.len()
    }

    pub fn stats(&self) -> Vec<LayerStats> {
        self.layers
            .iter()
            .map(|layer| {
                let mut counts = [0; ObjectKind::COUNT];
                for kind in ObjectKind::ALL {
                    counts[kind.index()] = layer.collection.count_of(kind);
                }
                LayerStats {
                    depth: layer.depth,
                    counts,
                }
            })
            .collect()
    }

    /// 导出锁定种子（扁平列表，按时间排序）
    pub fn locked_seeds(&self) -> Vec<SeedRecord> {
        let mut seeds: Vec<SeedRecord> = self.layers[0]
            .collection
            .iter()
            .filter_map(|id| self.arena.get(id))
            .filter_map(|obj| {
                obj.seed()
                    .map(|identity| SeedRecord::from_shape(identity, obj.time(), obj.shape()))
            })
            .collect();
        seeds.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.identity.cmp(&b.identity)));
        seeds
    }

    /// 导出当前偏好设置
    pub fn preferences(&self) -> Preferences {
        Preferences {
            config: EngineConfig {
                inception_level: self.inception_level(),
                ..self.config.clone()
            },
            generators: self.generators.export_settings(),
        }
    }

    // ========== 种子 ==========

    fn insert_seed(&mut self, record: &SeedRecord) -> ObjectId {
        let object = RelevantObject::locked(record.shape(), record.time, Some(record.identity));
        let id = self.arena.insert(object);
        self.layers[0].collection.insert_sorted(id, &self.arena);
        id
    }

    /// 追加种子并沿推导链生成
    ///
    /// 时间或位置不是有限值的种子被跳过并计入 `rejected`。
    pub fn seed(&mut self, records: &[SeedRecord]) -> GenerationReport {
        let mut report = GenerationReport::default();
        let mut inserted = 0;
        for record in records {
            if !accept_seed(record) {
                report.rejected += 1;
                continue;
            }
            self.insert_seed(record);
            inserted += 1;
        }
        tracing::debug!("Seeded {} locked objects", inserted);
        if inserted > 0 {
            report.absorb(self.reconcile(0));
        }
        report
    }

    /// 按标识增量重新加载种子
    ///
    /// - 不再存在的标识：释放
    /// - 新标识：插入并生成
    /// - 只有时间变化：更新时间并传播
    /// - 位置或类型变化：释放后重新插入
    /// - 时间或位置不是有限值：跳过，已有的同标识种子保持不变
    pub fn reseed(&mut self, records: &[SeedRecord]) -> GenerationReport {
        let mut report = GenerationReport::default();

        let existing: BTreeMap<SeedId, ObjectId> = self.layers[0]
            .collection
            .iter()
            .filter_map(|id| self.arena.get(id).and_then(|o| o.seed().map(|s| (s, id))))
            .collect();

        let mut incoming: BTreeMap<SeedId, &SeedRecord> = BTreeMap::new();
        let mut rejected = BTreeSet::new();
        for record in records {
            if !accept_seed(record) {
                rejected.insert(record.identity);
                report.rejected += 1;
                continue;
            }
            if incoming.insert(record.identity, record).is_some() {
                tracing::warn!("Duplicate seed identity {}, keeping the last record", record.identity);
            }
        }

        for (identity, id) in &existing {
            if !incoming.contains_key(identity) && !rejected.contains(identity) {
                report.disposed += self.dispose_cascade(*id);
            }
        }

        let mut inserted = 0;
        for (identity, record) in incoming {
            let Some(&id) = existing.get(&identity) else {
                self.insert_seed(record);
                inserted += 1;
                continue;
            };
            let same_shape = self
                .arena
                .get(id)
                .is_some_and(|obj| *obj.shape() == record.shape());
            if same_shape {
                if self.arena.time_of(id) != record.time {
                    self.assign_time(id, record.time);
                }
            } else {
                report.disposed += self.dispose_cascade(id);
                self.insert_seed(record);
                inserted += 1;
            }
        }

        tracing::info!(
            "Reseeded: {} new, {} disposed, {} rejected, {} kept",
            inserted,
            report.disposed,
            report.rejected,
            self.layers[0].count() - inserted
        );
        report.absorb(self.reconcile(0));
        report
    }

    // ========== 推导深度 ==========

    /// 设置推导深度
    ///
    /// 负数被拒绝且不修改状态；与当前深度相同时无操作。
    pub fn set_inception_level(&mut self, level: i64) -> Result<GenerationReport> {
        self.set_inception_level_with(level, &AtomicBool::new(false), |_| {})
    }

    /// 可取消地设置推导深度，只在图层边界检查 `cancel`
    pub fn set_inception_level_cancellable(
        &mut self,
        level: i64,
        cancel: &AtomicBool,
    ) -> Result<GenerationReport> {
        self.set_inception_level_with(level, cancel, |_| {})
    }

    pub(crate) fn set_inception_level_with(
        &mut self,
        level: i64,
        cancel: &AtomicBool,
        mut on_layer: impl FnMut(usize),
    ) -> Result<GenerationReport> {
        if level < 0 {
            return Err(ConfigurationError::NegativeInceptionLevel(level).into());
        }
        let target = level as usize;
        let mut report = GenerationReport::default();
        let mut completed = 0;

        while self.inception_level() != target {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("Inception level change cancelled at level {}", self.inception_level());
                return Err(EngineError::Cancelled {
                    completed_layers: completed,
                });
            }
            if self.inception_level() < target {
                report.absorb(self.push_layer());
            } else {
                report.absorb(self.pop_layer());
            }
            completed += 1;
            on_layer(self.inception_level());
        }

        if completed > 0 {
            tracing::info!(
                "Inception level set to {} ({} objects, {} faults)",
                target,
                self.arena.len(),
                report.faults
            );
        }
        Ok(report)
    }

    /// 追加一层，并以上一层的全部对象执行完整生成
    fn push_layer(&mut self) -> GenerationReport {
        let previous = self.layers.len() - 1;
        let depth = previous + 1;
        self.layers[previous].next = Some(depth);
        self.layers.push(RelevantObjectLayer::new(depth, Some(previous)));
        self.config.inception_level = depth;

        let mut report = GenerationReport::default();
        self.generate_layer(previous, &mut report);
        tracing::debug!(
            "Layer {} generated: {} created, {} merged",
            depth,
            report.created,
            report.merged
        );
        report
    }

    /// 移除最深的一层，先释放其中所有对象
    fn pop_layer(&mut self) -> GenerationReport {
        let depth = self.layers.len() - 1;
        debug_assert!(depth > 0, "the locked layer is never removed");

        let mut report = GenerationReport::default();
        let ids: Vec<ObjectId> = self.layers[depth].collection.iter().collect();
        for id in ids {
            report.disposed += self.dispose_cascade(id);
        }

        self.layers.pop();
        self.layers[depth - 1].next = None;
        self.config.inception_level = depth - 1;
        report
    }

    /// 释放所有生成层并从种子层重新生成
    pub fn regenerate(&mut self) -> GenerationReport {
        let level = self.inception_level();
        let mut report = GenerationReport::default();
        while self.inception_level() > 0 {
            report.absorb(self.pop_layer());
        }
        while self.inception_level() < level {
            report.absorb(self.push_layer());
        }
        tracing::debug!("Regenerated {} layers", level);
        report
    }

    // ========== 设置 ==========

    /// 更新生成器设置；设置变化时重新生成
    pub fn update_generator_settings(
        &mut self,
        id: GeneratorId,
        settings: GeneratorSettings,
    ) -> Result<GenerationReport> {
        match self.generators.update_settings(id, settings)? {
            None => Err(EngineError::UnknownGenerator(id)),
            Some(true) => Ok(self.regenerate()),
            Some(false) => Ok(GenerationReport::default()),
        }
    }

    /// 启用或停用生成器
    pub fn set_generator_active(&mut self, id: GeneratorId, active: bool) -> Result<GenerationReport> {
        let mut settings = self
            .generators
            .settings(id)
            .cloned()
            .ok_or(EngineError::UnknownGenerator(id))?;
        settings.is_active = active;
        self.update_generator_settings(id, settings)
    }

    /// 设置去重容差；变化时重新生成
    pub fn set_acceptable_difference(&mut self, value: f64) -> Result<GenerationReport> {
        validate_acceptable_difference(value)?;
        if self.config.acceptable_difference == value {
            return Ok(GenerationReport::default());
        }
        self.config.acceptable_difference = value;
        Ok(self.regenerate())
    }

    /// 应用偏好设置
    ///
    /// 全部校验通过后才修改状态。
    pub fn apply_preferences(&mut self, preferences: &Preferences) -> Result<GenerationReport> {
        preferences.config.validate()?;

        let changed = self.generators.apply_settings(&preferences.generators)?;
        self.config.max_snap_distance = preferences.config.max_snap_distance;

        let mut report = GenerationReport::default();
        if changed > 0 || self.config.acceptable_difference != preferences.config.acceptable_difference {
            self.config.acceptable_difference = preferences.config.acceptable_difference;
            report.absorb(self.regenerate());
        }
        report.absorb(self.set_inception_level(preferences.config.inception_level as i64)?);
        Ok(report)
    }
}

fn accept_seed(record: &SeedRecord) -> bool {
    if record.is_finite() {
        return true;
    }
    tracing::warn!(
        "Skipping seed {} with non-finite time {} or position ({}, {})",
        record.identity,
        record.time,
        record.position.x,
        record.position.y
    );
    false
}
