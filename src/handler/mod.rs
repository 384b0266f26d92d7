//! Downstream boundary: turning claimed items into commands and handing
//! them to whoever does the actual work.
//!
//! Both seams are traits so the poller can be wired to a real handler; the
//! crate ships a default translator and a handler that only logs.

use crate::error::{Error, Result};
use crate::model::{ProcessCommand, WorkItem};
use async_trait::async_trait;
use tracing::debug;

/// Maps claimed work items to handler commands, one to one and in order.
///
/// The mapping is total: if any item cannot be translated the whole batch
/// fails.
pub trait CommandTranslator: Send + Sync {
    fn translate(&self, items: &[WorkItem]) -> Result<Vec<ProcessCommand>>;
}

/// Consumes a batch of commands.
#[async_trait]
pub trait WorkHandler: Send + Sync {
    async fn handle(&self, commands: Vec<ProcessCommand>) -> Result<()>;
}

/// Copies identity, correlation key and payload across. Items without a
/// correlation key are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTranslator;

impl CommandTranslator for DefaultTranslator {
    fn translate(&self, items: &[WorkItem]) -> Result<Vec<ProcessCommand>> {
        items
            .iter()
            .map(|item| {
                if item.correlation_key.trim().is_empty() {
                    return Err(Error::Translation(format!(
                        "work item {} has no correlation key",
                        item.id
                    )));
                }
                Ok(ProcessCommand {
                    work_id: item.id,
                    correlation_key: item.correlation_key.clone(),
                    payload: item.payload.clone(),
                })
            })
            .collect()
    }
}

/// Accepts every batch and does nothing with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl WorkHandler for NoopHandler {
    async fn handle(&self, commands: Vec<ProcessCommand>) -> Result<()> {
        debug!(count = commands.len(), ?commands, "processing work");
        Ok(())
    }
}
