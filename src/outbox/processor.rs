use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::error::OutboxError;
use super::message::OutboxMessage;
use super::registry::EventRegistry;
use super::store::{MessageOutbox, DEFAULT_BATCH_SIZE};
use crate::messaging::InProcessEventBus;
use crate::metrics::Metrics;
use crate::persistence::UnitOfWork;

// ============================================================================
// Outbox Processor - forwards stored messages to the event bus
// ============================================================================
//
// One poll:
// 1. Fetch up to `batch_size` pending messages, oldest first
// 2. Rebuild each typed event through the registry
// 3. Dispatch it on the in-process bus
// 4. Mark it processed
//
// Delivery is at-least-once: a message is marked only after its handlers
// succeed, and a crash between dispatch and commit delivers it again.
//
// Commit modes:
// - PerMessage: every message commits on its own. A failure rolls back that
//   message and ends the poll, so later messages never overtake it.
// - PerBatch: one transaction for the poll. Any failure un-marks the whole
//   batch and every message in it is delivered again next time.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    #[default]
    PerMessage,
    PerBatch,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown commit mode `{0}`, expected `per-message` or `per-batch`")]
pub struct UnknownCommitMode(pub String);

impl FromStr for CommitMode {
    type Err = UnknownCommitMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-message" | "per_message" => Ok(CommitMode::PerMessage),
            "per-batch" | "per_batch" => Ok(CommitMode::PerBatch),
            other => Err(UnknownCommitMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub commit_mode: CommitMode,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: Duration::from_secs(10),
            commit_mode: CommitMode::default(),
        }
    }
}

/// Outcome of one poll
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub published: usize,
    /// Messages another processor got to first
    pub skipped: usize,
}

pub struct OutboxProcessor<U, O> {
    unit_of_work: Arc<U>,
    outbox: Arc<O>,
    registry: Arc<EventRegistry>,
    bus: Arc<InProcessEventBus>,
    config: ProcessorConfig,
    metrics: Option<Arc<Metrics>>,
}

impl<U, O> OutboxProcessor<U, O>
where
    U: UnitOfWork,
    O: MessageOutbox<Tx = U::Tx>,
{
    pub fn new(
        unit_of_work: Arc<U>,
        outbox: Arc<O>,
        registry: Arc<EventRegistry>,
        bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            unit_of_work,
            outbox,
            registry,
            bus,
            config: ProcessorConfig::default(),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run a single poll
    pub async fn process_batch(&self) -> Result<BatchReport, OutboxError> {
        let result = match self.config.commit_mode {
            CommitMode::PerMessage => self.process_per_message().await,
            CommitMode::PerBatch => self.process_per_batch().await,
        };

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(report) if report.fetched == 0 => "empty",
                Ok(_) => "success",
                Err(_) => "failure",
            };
            metrics.record_batch(outcome);
        }

        result
    }

    /// Poll until nothing is left to deliver. Returns how many messages were
    /// published.
    pub async fn drain(&self) -> Result<usize, OutboxError> {
        let mut total = 0;

        loop {
            let report = self.process_batch().await?;
            total += report.published;

            if report.fetched == 0 || report.published == 0 {
                break;
            }
        }

        Ok(total)
    }

    /// Poll every `poll_interval` until `shutdown` flips to true or its
    /// sender is dropped. Failures are logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            commit_mode = ?self.config.commit_mode,
            "🔄 Starting outbox processor"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.drain().await {
                        Ok(0) => {}
                        Ok(published) => tracing::info!(published = published, "📬 Outbox drained"),
                        Err(e) => tracing::error!(error = %e, "❌ Outbox poll failed, retrying next tick"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("🛑 Outbox processor stopped");
    }

    async fn process_per_message(&self) -> Result<BatchReport, OutboxError> {
        let messages = self.fetch_pending().await?;
        let mut report = BatchReport {
            fetched: messages.len(),
            ..BatchReport::default()
        };

        for message in &messages {
            let mut tx = self.unit_of_work.begin().await?;

            match self.outbox.lock_pending(&mut tx, message).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(message_id = %message.id, "⏭️  Message already taken, skipping");
                    self.unit_of_work.rollback(tx).await?;
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.rollback_quietly(tx).await;
                    return Err(e);
                }
            }

            if let Err(e) = self.deliver(&mut tx, message).await {
                self.rollback_quietly(tx).await;
                tracing::error!(
                    message_id = %message.id,
                    message_type = %message.message_type,
                    published = report.published,
                    error = %e,
                    "Stopping batch at failed message"
                );
                return Err(e);
            }

            self.unit_of_work.commit(tx).await?;
            report.published += 1;
        }

        Ok(report)
    }

    async fn process_per_batch(&self) -> Result<BatchReport, OutboxError> {
        let mut tx = self.unit_of_work.begin().await?;

        let messages = match self.outbox.to_publish(&mut tx, self.config.batch_size).await {
            Ok(messages) => messages,
            Err(e) => {
                self.rollback_quietly(tx).await;
                return Err(e);
            }
        };

        for message in &messages {
            if let Err(e) = self.deliver(&mut tx, message).await {
                self.rollback_quietly(tx).await;
                tracing::error!(
                    message_id = %message.id,
                    message_type = %message.message_type,
                    batch_size = messages.len(),
                    error = %e,
                    "Rolling back whole batch"
                );
                return Err(e);
            }
        }

        self.unit_of_work.commit(tx).await?;

        Ok(BatchReport {
            fetched: messages.len(),
            published: messages.len(),
            skipped: 0,
        })
    }

    async fn fetch_pending(&self) -> Result<Vec<OutboxMessage>, OutboxError> {
        let mut tx = self.unit_of_work.begin().await?;

        match self.outbox.to_publish(&mut tx, self.config.batch_size).await {
            Ok(messages) => {
                self.unit_of_work.commit(tx).await?;
                if !messages.is_empty() {
                    tracing::debug!(message_count = messages.len(), "Fetched pending outbox messages");
                }
                Ok(messages)
            }
            Err(e) => {
                self.rollback_quietly(tx).await;
                Err(e)
            }
        }
    }

    async fn deliver(&self, tx: &mut U::Tx, message: &OutboxMessage) -> Result<(), OutboxError> {
        let message_type = message.message_type.as_str();
        let started = Instant::now();

        let event = match self.registry.decode(message) {
            Ok(event) => event,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_outbox_failure(message_type, e.reason());
                }
                return Err(e);
            }
        };

        let dispatched = self.bus.publish(&*event);
        if let Some(metrics) = &self.metrics {
            metrics.record_outbox_message(message_type, started.elapsed().as_secs_f64(), dispatched.is_ok());
        }
        let handlers = dispatched.map_err(|source| OutboxError::Dispatch {
            message_id: message.id,
            source,
        })?;

        self.outbox.mark_as_published(tx, message).await?;

        tracing::info!(
            message_id = %message.id,
            event_id = %event.event_id(),
            message_type = message_type,
            handlers = handlers,
            "✅ Delivered outbox message"
        );
        Ok(())
    }

    async fn rollback_quietly(&self, tx: U::Tx) {
        if let Err(e) = self.unit_of_work.rollback(tx).await {
            tracing::warn!(error = %e, "Rollback failed");
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
