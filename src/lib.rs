pub mod batching;
pub mod config;
pub mod model;
pub mod server;

pub use batching::{BatchError, BatchScheduler, BatchWorker, BatcherConfig};
