// 區段寫入完成後才派發下一個區段

use crate::core::worker_pool::WorkerPool;
use crate::domain::model::{Chunk, LookupOutcome, RunReport, WorkItem};
use crate::domain::ports::{Lookup, ResultSink};
use crate::utils::error::{LookupError, Result};
use crate::utils::monitor::SystemMonitor;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Flushed,
    Done,
}

/// 依序切成不重疊的區段，最後一段可能較短
pub fn chunk(items: Vec<WorkItem>, size: usize) -> Vec<Chunk> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();
    let mut offset = 0;

    while items.peek().is_some() {
        let slice: Vec<WorkItem> = items.by_ref().take(size).collect();
        let len = slice.len();
        chunks.push(Chunk {
            index: chunks.len(),
            offset,
            items: slice,
        });
        offset += len;
    }

    chunks
}

pub struct BatchCoordinator<L: Lookup, S: ResultSink> {
    lookup: Arc<L>,
    sink: S,
    pool: WorkerPool,
    chunk_size: usize,
    monitor: SystemMonitor,
}

impl<L: Lookup + 'static, S: ResultSink> BatchCoordinator<L, S> {
    pub fn new(lookup: Arc<L>, sink: S, pool: WorkerPool, chunk_size: usize) -> Self {
        Self {
            lookup,
            sink,
            pool,
            chunk_size: chunk_size.max(1),
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    fn transition(&self, chunk_number: usize, from: ChunkState, to: ChunkState) {
        tracing::debug!("[CHUNK {}] {:?} -> {:?}", chunk_number, from, to);
    }

    /// 依序處理每個區段；寫入失敗時不再派發後續區段
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunReport> {
        let started = Instant::now();
        let total = items.len();
        let chunks = chunk(items, self.chunk_size);
        let chunk_count = chunks.len();

        let mut processed = 0;
        let mut succeeded = 0;
        let mut failed = 0;
        let mut flushed = 0;

        for chunk in chunks {
            let chunk_number = chunk.index + 1;
            let (start, end) = chunk.bounds();
            self.transition(chunk_number, ChunkState::Pending, ChunkState::InFlight);
            tracing::info!("🔄 Processing items {}-{} of {}", start, end, total);

            let mut buffer = Vec::with_capacity(chunk.items.len());
            let mut completions =
                std::pin::pin!(self.pool.run(self.lookup.clone(), chunk.items));

            while let Some(done) = completions.next().await {
                processed += 1;
                match done.outcome {
                    LookupOutcome::Success(record) => {
                        succeeded += 1;
                        buffer.push(record);
                        tracing::info!("✅ [{}/{}] {}", processed, total, done.item);
                    }
                    LookupOutcome::Failure { reason, .. } => {
                        failed += 1;
                        tracing::warn!(
                            "❌ [{}/{}] {} ({})",
                            processed,
                            total,
                            done.item,
                            reason
                        );
                    }
                }
            }

            if let Err(e) = self.sink.append(&buffer).await {
                tracing::error!(
                    "❌ Failed to save chunk {}-{} to {}: {}",
                    start,
                    end,
                    self.sink.location().display(),
                    e
                );
                return Err(LookupError::Persistence {
                    chunk: chunk_number,
                    message: e.to_string(),
                });
            }

            flushed += 1;
            self.transition(chunk_number, ChunkState::InFlight, ChunkState::Flushed);
            tracing::info!("💾 Chunk {}-{} saved ({} records)", start, end, buffer.len());
            self.monitor
                .log_stats(&format!("Chunk {}/{}", chunk_number, chunk_count));
        }

        self.transition(chunk_count, ChunkState::Flushed, ChunkState::Done);

        Ok(RunReport {
            total,
            succeeded,
            failed,
            chunks: flushed,
            output: self.sink.location().to_path_buf(),
            elapsed: started.elapsed(),
        })
    }
}
