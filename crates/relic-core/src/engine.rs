//! 引擎门面
//!
//! [`RelevanceEngine`] 把推导图和宿主提供的服务（种子来源、偏好存储）组合在一起。
//! 服务通过 [`EngineContext`] 显式传入，引擎内部没有全局状态。

use crate::background::BackgroundRegeneration;
use crate::config::{EngineConfig, PreferenceStore};
use crate::error::{EngineError, Result};
use crate::generator::GeneratorSet;
use crate::layer::GenerationReport;
use crate::layers::LayerCollection;
use crate::math::Point2;
use crate::object::ObjectId;
use crate::seed::SeedProvider;
use crate::snap::{KindMask, SnapConfig, SnapPoint};

/// 宿主提供的服务
pub struct EngineContext {
    pub seeds: Box<dyn SeedProvider>,
    pub store: Option<Box<dyn PreferenceStore>>,
}

impl EngineContext {
    pub fn new(seeds: impl SeedProvider + 'static) -> Self {
        Self {
            seeds: Box::new(seeds),
            store: None,
        }
    }

    pub fn with_store(mut self, store: impl PreferenceStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
}

/// 相关对象引擎
pub struct RelevanceEngine {
    context: EngineContext,
    graph: LayerCollection,
}

impl RelevanceEngine {
    /// 创建引擎，读取一次种子并生成到配置的深度
    pub fn new(config: EngineConfig, generators: GeneratorSet, mut context: EngineContext) -> Result<Self> {
        let seeds = context.seeds.seeds();
        let (graph, report) = LayerCollection::with_seeds(config, generators, &seeds)?;
        tracing::info!(
            "Engine started with {} seeds, {} derived objects, {} faults",
            seeds.len(),
            report.created,
            report.faults
        );
        Ok(Self { context, graph })
    }

    pub fn graph(&self) -> &LayerCollection {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut LayerCollection {
        &mut self.graph
    }

    /// 重新读取种子并增量更新推导图
    pub fn reload_seeds(&mut self) -> GenerationReport {
        let seeds = self.context.seeds.seeds();
        self.graph.reseed(&seeds)
    }

    /// 从存储读取并应用偏好设置；没有存储或没有已保存的设置时无操作
    pub fn load_preferences(&mut self) -> Result<GenerationReport> {
        let Some(store) = self.context.store.as_mut() else {
            return Ok(GenerationReport::default());
        };
        match store.load().map_err(EngineError::Store)? {
            Some(preferences) => self.graph.apply_preferences(&preferences),
            None => {
                tracing::debug!("No saved preferences");
                Ok(GenerationReport::default())
            }
        }
    }

    /// 保存当前偏好设置；没有存储时无操作
    pub fn save_preferences(&mut self) -> Result<()> {
        let preferences = self.graph.preferences();
        if let Some(store) = self.context.store.as_mut() {
            store.save(&preferences).map_err(EngineError::Store)?;
        }
        Ok(())
    }

    pub fn set_inception_level(&mut self, level: i64) -> Result<GenerationReport> {
        self.graph.set_inception_level(level)
    }

    /// 在后台调整深度，结果通过 [`publish`](Self::publish) 替换当前图
    pub fn regenerate_in_background(&self, target_level: usize) -> BackgroundRegeneration {
        BackgroundRegeneration::spawn(self.graph.clone(), target_level)
    }

    /// 用后台完成的图整体替换当前图
    pub fn publish(&mut self, graph: LayerCollection) {
        tracing::debug!(
            "Published graph with {} objects at level {}",
            graph.object_count(),
            graph.inception_level()
        );
        self.graph = graph;
    }

    pub fn nearest(&self, point: Point2, mask: KindMask) -> Option<ObjectId> {
        self.graph.nearest(point, mask, None)
    }

    /// 使用配置中的最大捕捉距离进行捕捉
    pub fn snap(&self, point: Point2) -> Option<SnapPoint> {
        let config = SnapConfig {
            tolerance: self.graph.config().max_snap_distance.unwrap_or(f64::INFINITY),
            ..Default::default()
        };
        self.graph.snap(point, &config)
    }
}
