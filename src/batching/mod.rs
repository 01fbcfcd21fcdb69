//! Dynamic micro-batching scheduler.
//!
//! Any number of concurrent callers submit payloads through a
//! [`BatchScheduler`] handle and await their individual results. Behind the
//! handle, a single assembler task groups admitted items into batches (closed
//! by size threshold or by a timer anchored to the batch's first item),
//! invokes a [`BatchWorker`] once per closed batch on the blocking pool, and
//! resolves every caller's one-shot result slot in submission order.

mod error;
mod item;
mod scheduler;

pub use error::BatchError;
pub use item::{Batch, Item};
pub use scheduler::{BatchScheduler, BatchWorker, BatcherConfig};
