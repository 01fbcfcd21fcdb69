use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::error::BatchError;
use super::item::{Batch, Item};

/// The expensive batch-capable function the scheduler amortizes calls over.
///
/// `process` receives a closed batch's payloads in submission order and must
/// return one output per payload, in the same order. It is invoked on the
/// blocking thread pool, so synchronous model code belongs here as-is. A
/// returned error fails the whole batch.
pub trait BatchWorker: Send + Sync + 'static {
    type Payload: Send + 'static;
    type Output: Send + 'static;

    fn process(&self, payloads: Vec<Self::Payload>) -> anyhow::Result<Vec<Self::Output>>;
}

/// Batch formation policy, fixed for the scheduler's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    /// Close the open batch as soon as it holds this many items.
    pub max_batch_size: usize,
    /// Close the open batch this long after its first item was enqueued,
    /// even if the size threshold was never reached.
    pub max_wait: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_wait: Duration::from_millis(100),
        }
    }
}

/// Cloneable handle to the micro-batching scheduler.
///
/// Construct one scheduler per worker at startup and share the handle;
/// submissions from any number of tasks are admitted in arrival order and
/// drained by a single assembler task that owns all batch state.
pub struct BatchScheduler<W: BatchWorker> {
    queue: flume::Sender<Item<W::Payload, W::Output>>,
}

impl<W: BatchWorker> Clone for BatchScheduler<W> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<W: BatchWorker> BatchScheduler<W> {
    /// Spawn the assembler task and return a handle to it.
    ///
    /// Must be called from within a tokio runtime. The assembler exits once
    /// every handle has been dropped, flushing any open batch first.
    pub fn new(config: BatcherConfig, worker: W) -> Self {
        assert!(config.max_batch_size >= 1, "max_batch_size must be at least 1");
        let (tx, rx) = flume::unbounded();
        tokio::spawn(assembler_loop(rx, config, Arc::new(worker)));
        Self { queue: tx }
    }

    /// Submit a single payload and await its result.
    ///
    /// The caller suspends only on its own result slot; it never observes
    /// the other items that happened to share its batch.
    pub async fn submit(&self, payload: W::Payload) -> Result<W::Output, BatchError> {
        let rx = self.enqueue(payload)?;
        rx.await.map_err(|_| BatchError::Closed)?
    }

    /// Submit an ordered sequence of payloads and await all results.
    ///
    /// Every item is admitted before any result is awaited, so one caller's
    /// items occupy consecutive queue positions. Results come back in payload
    /// order even when the items were split across worker batches or
    /// interleaved with other callers' items.
    pub async fn submit_many(
        &self,
        payloads: Vec<W::Payload>,
    ) -> Result<Vec<W::Output>, BatchError> {
        if payloads.is_empty() {
            return Err(BatchError::Validation(
                "input must contain at least one payload".to_string(),
            ));
        }
        let receivers = payloads
            .into_iter()
            .map(|payload| self.enqueue(payload))
            .collect::<Result<Vec<_>, _>>()?;
        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            results.push(rx.await.map_err(|_| BatchError::Closed)??);
        }
        Ok(results)
    }

    fn enqueue(
        &self,
        payload: W::Payload,
    ) -> Result<oneshot::Receiver<Result<W::Output, BatchError>>, BatchError> {
        let (item, rx) = Item::new(payload);
        self.queue.send(item).map_err(|_| BatchError::Closed)?;
        Ok(rx)
    }
}

/// The single task that owns batch state transitions.
///
/// Per batch: EMPTY until a first item arrives, ACCUMULATING while racing the
/// size threshold against the flush timer, CLOSED on whichever fires first.
/// The timer stays anchored to the batch's first item; re-arming it on later
/// arrivals would starve a slow trickle of single-item submissions.
async fn assembler_loop<W: BatchWorker>(
    queue: flume::Receiver<Item<W::Payload, W::Output>>,
    config: BatcherConfig,
    worker: Arc<W>,
) {
    loop {
        let first = match queue.recv_async().await {
            Ok(item) => item,
            // Every handle dropped and nothing left to flush.
            Err(_) => break,
        };
        let mut batch = Batch::open(first);
        let deadline = tokio::time::Instant::from_std(batch.opened_at() + config.max_wait);

        while batch.len() < config.max_batch_size {
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => break,
                item = queue.recv_async() => match item {
                    Ok(item) => batch.push(item),
                    Err(_) => break,
                },
            }
        }

        debug!(
            batch_size = batch.len(),
            waited_ms = batch.opened_at().elapsed().as_millis() as u64,
            "closing batch"
        );
        // Handing off detaches the batch from admission; items arriving from
        // here on belong to the next batch.
        dispatch(batch, Arc::clone(&worker));
    }
}

/// Run the worker for one closed batch and resolve every result slot exactly
/// once. Detached from the assembler so a slow worker call never blocks
/// admission or the formation of subsequent batches.
fn dispatch<W: BatchWorker>(batch: Batch<W::Payload, W::Output>, worker: Arc<W>) {
    tokio::spawn(async move {
        let (payloads, slots): (Vec<_>, Vec<_>) = batch
            .into_items()
            .into_iter()
            .map(|item| (item.payload, item.slot))
            .unzip();
        let expected = payloads.len();

        let outcome = match tokio::task::spawn_blocking(move || worker.process(payloads)).await {
            Ok(Ok(outputs)) if outputs.len() == expected => Ok(outputs),
            Ok(Ok(outputs)) => {
                error!(
                    expected,
                    actual = outputs.len(),
                    "worker broke the one-result-per-payload contract"
                );
                Err(BatchError::LengthMismatch {
                    expected,
                    actual: outputs.len(),
                })
            }
            Ok(Err(err)) => {
                warn!(batch_size = expected, error = %err, "worker failed, failing the whole batch");
                Err(BatchError::Worker(format!("{err:#}")))
            }
            Err(err) => {
                error!(batch_size = expected, error = %err, "worker task panicked");
                Err(BatchError::Worker(err.to_string()))
            }
        };

        match outcome {
            Ok(outputs) => {
                for (slot, output) in slots.into_iter().zip(outputs) {
                    // A dropped receiver means the caller went away after
                    // admission; its item stayed committed to the batch and
                    // the unread result is simply discarded.
                    let _ = slot.send(Ok(output));
                }
            }
            Err(err) => {
                for slot in slots {
                    let _ = slot.send(Err(err.clone()));
                }
            }
        }
    });
}
