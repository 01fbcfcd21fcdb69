use std::time::Duration;

use clap::Parser;

use crate::batching::BatcherConfig;

/// Command-line and environment configuration for the embedding server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Model repo id on the Hugging Face hub (e.g. sentence-transformers/all-MiniLM-L6-v2)
    #[arg(long = "m", env = "MODEL_NAME")]
    pub model_id: String,

    /// Truncate embeddings to this many leading dimensions
    #[arg(long, env = "EMBEDDING_DIMENSIONS")]
    pub dimensions: Option<usize>,

    /// Host address to bind to, to serve on host:port
    #[arg(long = "h", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to serve on (host:port)
    #[arg(long = "p", default_value_t = 8000)]
    pub port: u16,

    /// Maximum number of payloads handed to the model in one call
    #[arg(long, default_value_t = 100, env = "BATCH_MAX_SIZE")]
    pub max_batch_size: usize,

    /// Maximum time (ms) an admitted payload may wait before its batch is flushed
    #[arg(long, default_value_t = 100, env = "BATCH_MAX_WAIT_MS")]
    pub max_wait_ms: u64,

    /// Run the model on CPU even when an accelerator is available
    #[arg(long, default_value_t = false)]
    pub cpu: bool,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_batch_size >= 1, "--max-batch-size must be at least 1");
        if let Some(dim) = self.dimensions {
            anyhow::ensure!(dim >= 1, "--dimensions must be at least 1");
        }
        Ok(())
    }

    pub fn batcher_config(&self) -> BatcherConfig {
        BatcherConfig {
            max_batch_size: self.max_batch_size,
            max_wait: Duration::from_millis(self.max_wait_ms),
        }
    }
}
