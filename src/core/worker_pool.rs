use crate::domain::model::{FailureReason, LookupOutcome, WorkItem};
use crate::domain::ports::{Lookup, WorkerId};
use futures::stream::{self, Stream, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_WORKERS: usize = 3;

/// 單一項目的完成結果
#[derive(Debug, Clone)]
pub struct Completed {
    pub item: WorkItem,
    pub outcome: LookupOutcome,
    pub worker: WorkerId,
}

/// Free worker slots; a slot id is held for the duration of one lookup.
#[derive(Debug)]
struct WorkerSlots(Mutex<Vec<WorkerId>>);

impl WorkerSlots {
    fn new(worker_count: usize) -> Self {
        Self(Mutex::new((1..=worker_count).rev().collect()))
    }

    fn acquire(&self) -> WorkerId {
        // buffer_unordered 最多同時輪詢 worker_count 個 future，所以一定有空槽
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    fn release(&self, worker: WorkerId) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(worker);
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Looks up every item with at most `worker_count` calls in flight.
    ///
    /// The stream yields in completion order and produces exactly one
    /// [`Completed`] per item. A lookup task that panics is reported as
    /// [`FailureReason::Aborted`] instead of tearing down the pool.
    pub fn run<L>(
        &self,
        lookup: Arc<L>,
        items: Vec<WorkItem>,
    ) -> impl Stream<Item = Completed> + Send + 'static
    where
        L: Lookup + 'static,
    {
        let slots = Arc::new(WorkerSlots::new(self.worker_count));

        stream::iter(items)
            .map(move |item| {
                let lookup = lookup.clone();
                let slots = slots.clone();
                async move {
                    let worker = slots.acquire();

                    let task = {
                        let item = item.clone();
                        tokio::spawn(async move { lookup.lookup(&item, worker).await })
                    };
                    let outcome = match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(
                                "[worker-{}] Lookup task for {} did not finish: {}",
                                worker,
                                item,
                                e
                            );
                            LookupOutcome::failure(&item, FailureReason::Aborted(e.to_string()))
                        }
                    };

                    slots.release(worker);
                    Completed {
                        item,
                        outcome,
                        worker,
                    }
                }
            })
            .buffer_unordered(self.worker_count)
    }
}
