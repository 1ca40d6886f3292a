//! 后台重新生成
//!
//! 在工作线程上对推导图的私有副本执行深度变化，完成后整体交回调用方。
//! 调用方的图在此期间保持可读，结果由调用方一次性替换，推导图始终只有一个写入者。

use crate::error::{EngineError, Result};
use crate::layer::GenerationReport;
use crate::layers::LayerCollection;
use crossbeam::channel::{self, Receiver, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// 工作线程发出的消息
#[derive(Debug)]
pub enum RegenerationEvent {
    /// 完成了一层，附带当前深度
    LayerDone(usize),
    /// 全部完成
    Finished(Result<(LayerCollection, GenerationReport)>),
}

/// 后台重新生成任务句柄
pub struct BackgroundRegeneration {
    cancel: Arc<AtomicBool>,
    events: Receiver<RegenerationEvent>,
    handle: Option<thread::JoinHandle<()>>,
    progress: usize,
    target_level: usize,
}

impl BackgroundRegeneration {
    /// 在工作线程上把 `snapshot` 调整到 `target_level`
    pub fn spawn(snapshot: LayerCollection, target_level: usize) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_worker = cancel.clone();
        let (tx, rx) = channel::unbounded();

        let handle = thread::spawn(move || {
            let mut graph = snapshot;
            let progress = tx.clone();
            let result = graph
                .set_inception_level_with(target_level as i64, &cancel_worker, |level| {
                    let _ = progress.send(RegenerationEvent::LayerDone(level));
                })
                .map(|report| (graph, report));
            let _ = tx.send(RegenerationEvent::Finished(result));
        });

        tracing::debug!("Background regeneration to level {} started", target_level);
        Self {
            cancel,
            events: rx,
            handle: Some(handle),
            progress: 0,
            target_level,
        }
    }

    pub fn target_level(&self) -> usize {
        self.target_level
    }

    /// 最近完成的深度
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// 请求取消，工作线程在下一个图层边界停止
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// 非阻塞地取回结果，尚未完成时返回 `None`
    pub fn try_finish(&mut self) -> Option<Result<LayerCollection>> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Some(result) = self.handle_event(event) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.join();
                    return Some(Err(EngineError::WorkerDisconnected));
                }
            }
        }
    }

    /// 阻塞直到结果可用
    pub fn wait(mut self) -> Result<LayerCollection> {
        loop {
            match self.events.recv() {
                Ok(event) => {
                    if let Some(result) = self.handle_event(event) {
                        return result;
                    }
                }
                Err(_) => {
                    self.join();
                    return Err(EngineError::WorkerDisconnected);
                }
            }
        }
    }

    fn handle_event(&mut self, event: RegenerationEvent) -> Option<Result<LayerCollection>> {
        match event {
            RegenerationEvent::LayerDone(level) => {
                self.progress = level;
                None
            }
            RegenerationEvent::Finished(result) => {
                self.join();
                Some(result.map(|(graph, report)| {
                    tracing::info!(
                        "Background regeneration finished at level {}: {} created, {} faults",
                        graph.inception_level(),
                        report.created,
                        report.faults
                    );
                    graph
                }))
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Background regeneration worker panicked");
            }
        }
    }
}

impl Drop for BackgroundRegeneration {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::generator::GeneratorSet;
    use crate::generators::MidpointGenerator;
    use crate::seed::SeedRecord;

    fn snapshot() -> LayerCollection {
        let mut generators = GeneratorSet::new();
        generators.register(MidpointGenerator);
        let config = EngineConfig {
            acceptable_difference: 0.01,
            inception_level: 0,
            ..Default::default()
        };
        let seeds = [
            SeedRecord::point(1, 0.0, 0.0, 0.0),
            SeedRecord::point(2, 1.0, 100.0, 0.0),
            SeedRecord::point(3, 2.0, 30.0, 70.0),
        ];
        LayerCollection::with_seeds(config, generators, &seeds).unwrap().0
    }

    #[test]
    fn test_background_matches_foreground() {
        let mut foreground = snapshot();
        let job = BackgroundRegeneration::spawn(foreground.clone(), 2);
        foreground.set_inception_level(2).unwrap();

        let background = job.wait().unwrap();
        assert_eq!(background.inception_level(), 2);
        assert_eq!(background.stats(), foreground.stats());
    }

    #[test]
    fn test_try_finish_eventually_returns() {
        let mut job = BackgroundRegeneration::spawn(snapshot(), 1);
        let result = loop {
            if let Some(result) = job.try_finish() {
                break result;
            }
            thread::yield_now();
        };
        assert_eq!(result.unwrap().inception_level(), 1);
        assert_eq!(job.progress(), 1);
    }
}
