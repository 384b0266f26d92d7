//! Control plane: drives poll cycles on a fixed delay until shutdown.

use super::cycle::PollCycle;
use crate::db::CollectionName;
use crate::error::{Error, Result};
use crate::handler::{CommandTranslator, WorkHandler};
use crate::model::Status;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Configuration for the poller.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Collection (table) the poller watches.
    pub collection: CollectionName,
    /// Status literal of claimable items.
    pub ready_status: Status,
    /// Status literal a winning claim writes.
    pub owned_status: Status,
    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Maximum candidates fetched per cycle.
    pub max_batch: usize,
    /// Deadline for each store operation and for the forward step.
    pub operation_timeout: Duration,
    /// Run each cycle's fetch and claims in one transaction.
    pub transactional: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            collection: CollectionName::default(),
            ready_status: Status::ready(),
            owned_status: Status::owned(),
            poll_interval: Duration::from_millis(1000),
            max_batch: 15,
            operation_timeout: Duration::from_secs(5),
            transactional: true,
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch == 0 {
            return Err(Error::Config("max batch size must be at least 1".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        if self.operation_timeout.is_zero() {
            return Err(Error::Config("operation timeout must be positive".to_string()));
        }
        if self.ready_status.as_str().is_empty() || self.owned_status.as_str().is_empty() {
            return Err(Error::Config("status literals must not be empty".to_string()));
        }
        if self.ready_status == self.owned_status {
            return Err(Error::Config(format!(
                "ready and owned status are both {:?}",
                self.ready_status.as_str()
            )));
        }
        Ok(())
    }
}

/// The poll loop. One cycle at a time; cloning shares the shutdown signal.
#[derive(Clone)]
pub struct ControlPlane {
    cycle: Arc<PollCycle>,
    shutdown: Arc<Notify>,
}

impl ControlPlane {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn CommandTranslator>,
        handler: Arc<dyn WorkHandler>,
        config: PollConfig,
    ) -> Self {
        Self {
            cycle: Arc::new(PollCycle::new(store, translator, handler, config)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn cycle(&self) -> &PollCycle {
        &self.cycle
    }

    /// Signal the loop to stop. The in-flight cycle, if any, runs to the end.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run poll cycles until shutdown.
    pub async fn run(&self) {
        let config = self.cycle.config();
        info!(
            collection = %config.collection,
            ready = %config.ready_status,
            max_batch = config.max_batch,
            interval_ms = config.poll_interval.as_millis() as u64,
            transactional = config.transactional,
            "poller started"
        );

        loop {
            // Runs outside the select: shutdown is only observed between
            // cycles, so claims already issued always finish.
            self.cycle.run_once().await;

            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    info!("poller shutting down");
                    return;
                }
                _ = tokio::time::sleep(config.poll_interval) => {}
            }
        }
    }
}
