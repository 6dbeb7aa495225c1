//! Attempt Log Writer (spec.md §4.6): batched, append-only writes of
//! Event and Attempt rows to a log backend. The API reads from the same
//! backend; this module only specifies the write path.

use crate::entities::{Attempt, Event};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub enum LogRow {
    Event(Event),
    Attempt(Attempt),
}

/// The backend a batch is flushed to. `outpost-api` provides the
/// production implementation (e.g. backed by a columnar store or SQL);
/// tests use an in-memory recorder.
#[async_trait]
pub trait LogBackend: Send + Sync {
    async fn write_batch(&self, rows: Vec<LogRow>) -> Result<(), String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogWriterConfig {
    pub batch_size: usize,
    pub batch_threshold: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for LogWriterConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_threshold: Duration::seconds(5),
            max_retries: 5,
            retry_base_delay: Duration::milliseconds(200),
        }
    }
}

struct Buffer {
    rows: Vec<LogRow>,
    oldest_at: Option<DateTime<Utc>>,
}

/// Batches rows and flushes on size or time threshold. Visibility to
/// readers is only guaranteed after flush (spec.md §4.6); callers (the
/// Retry Scheduler, the Worker) must not assume read-after-write through
/// this path.
pub struct AttemptLogWriter {
    backend: Arc<dyn LogBackend>,
    config: LogWriterConfig,
    buffer: Mutex<Buffer>,
}

impl AttemptLogWriter {
    pub fn new(backend: Arc<dyn LogBackend>, config: LogWriterConfig) -> Self {
        Self {
            backend,
            config,
            buffer: Mutex::new(Buffer {
                rows: Vec::new(),
                oldest_at: None,
            }),
        }
    }

    /// Buffer `row`, flushing immediately if the batch size threshold is
    /// reached.
    pub async fn append(&self, row: LogRow) {
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            if buffer.rows.is_empty() {
                buffer.oldest_at = Some(Utc::now());
            }
            buffer.rows.push(row);
            buffer.rows.len() >= self.config.batch_size
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Flush if either the batch size or the time threshold has been
    /// reached since the oldest buffered row. Intended to be called on a
    /// timer by the service binary alongside `append`'s size-triggered
    /// flush.
    pub async fn flush_if_due(&self) {
        let due = {
            let buffer = self.buffer.lock().await;
            match buffer.oldest_at {
                Some(oldest) => Utc::now() - oldest >= self.config.batch_threshold,
                None => false,
            }
        };
        if due {
            self.flush().await;
        }
    }

    pub async fn flush(&self) {
        let rows = {
            let mut buffer = self.buffer.lock().await;
            if buffer.rows.is_empty() {
                return;
            }
            buffer.oldest_at = None;
            std::mem::take(&mut buffer.rows)
        };

        let mut attempt = 0;
        loop {
            match self.backend.write_batch(rows.clone()).await {
                Ok(()) => {
                    info!(rows = rows.len(), "flushed attempt log batch");
                    return;
                }
                Err(_) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_base_delay * attempt as i32;
                    tokio::time::sleep(delay.to_std().unwrap_or_default()).await;
                }
                Err(reason) => {
                    crate::metrics::metrics()
                        .log_writer_permanent_failures_total
                        .inc();
                    crate::metrics::metrics().record_error(crate::error::ErrorCategory::Permanent);
                    error!(
                        rows = rows.len(),
                        error = reason,
                        "attempt log batch failed permanently, delivery unaffected"
                    );
                    return;
                }
            }
        }
    }
}

/// In-memory [`LogBackend`] for tests and the service binary's in-memory
/// deployment mode.
#[derive(Default)]
pub struct InMemoryLogBackend {
    rows: Mutex<Vec<LogRow>>,
}

impl InMemoryLogBackend {
    pub async fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl LogBackend for InMemoryLogBackend {
    async fn write_batch(&self, mut rows: Vec<LogRow>) -> Result<(), String> {
        self.rows.lock().await.append(&mut rows);
        Ok(())
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
