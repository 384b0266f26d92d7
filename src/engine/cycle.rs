//! One poll cycle: fetch → claim → filter → forward.
//!
//! A cycle never fails as a whole. Every fault is contained and reported in
//! the [`CycleReport`] so the loop can simply tick again.

use super::claim::Claimer;
use super::control::PollConfig;
use super::fetch::CandidateFetcher;
use crate::error::{Error, with_timeout};
use crate::handler::{CommandTranslator, WorkHandler};
use crate::model::{WorkId, WorkItem};
use crate::store::DocumentStore;
use crate::telemetry::metrics;
use crate::telemetry::work::{record_claim, record_cycle_counts, start_cycle_span};
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span, debug, error, info, warn};

/// How a cycle ended.
#[derive(Debug, Default)]
pub enum CycleOutcome {
    /// No candidates were ready. No writes happened.
    #[default]
    Idle,
    /// Candidates were fetched but every claim was lost or faulted.
    NoneWon,
    /// The won items were handed to the handler and it succeeded.
    Forwarded,
    /// The session could not be opened or the fetch failed.
    FetchFailed(Error),
    /// The transactional scope failed to commit; none of this cycle's claims
    /// are visible.
    CommitFailed(Error),
    /// Claims stand but the items could not be translated, so nothing was
    /// forwarded.
    TranslationFailed(Error),
    /// Claims stand and the batch was forwarded, but the handler failed.
    HandlerFailed(Error),
}

impl CycleOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Idle => "idle",
            CycleOutcome::NoneWon => "none_won",
            CycleOutcome::Forwarded => "forwarded",
            CycleOutcome::FetchFailed(_) => "fetch_failed",
            CycleOutcome::CommitFailed(_) => "commit_failed",
            CycleOutcome::TranslationFailed(_) => "translation_failed",
            CycleOutcome::HandlerFailed(_) => "handler_failed",
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Candidates returned by the fetch.
    pub fetched: usize,
    /// Items this cycle won, in fetch order.
    pub claimed: Vec<WorkId>,
    /// Claims that matched nothing (another worker won, or the item moved on).
    pub lost: usize,
    /// Claims that hit a store fault or timeout.
    pub faulted: usize,
    pub outcome: CycleOutcome,
}

/// Fetches, claims and forwards one batch per call.
pub struct PollCycle {
    store: Arc<dyn DocumentStore>,
    translator: Arc<dyn CommandTranslator>,
    handler: Arc<dyn WorkHandler>,
    fetcher: CandidateFetcher,
    claimer: Claimer,
    config: PollConfig,
}

impl PollCycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn CommandTranslator>,
        handler: Arc<dyn WorkHandler>,
        config: PollConfig,
    ) -> Self {
        Self {
            store,
            translator,
            handler,
            fetcher: CandidateFetcher::new(
                config.ready_status.clone(),
                config.max_batch,
                config.operation_timeout,
            ),
            claimer: Claimer::new(
                config.ready_status.clone(),
                config.owned_status.clone(),
                config.operation_timeout,
            ),
            config,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Run one cycle to completion.
    pub async fn run_once(&self) -> CycleReport {
        let started = Instant::now();
        let span = start_cycle_span(self.config.collection.as_str(), self.config.max_batch);

        let report = self.cycle(&span).instrument(span.clone()).await;

        record_cycle_counts(&span, report.fetched, report.claimed.len());
        let collection = KeyValue::new("collection", self.config.collection.to_string());
        metrics::poll_cycles().add(
            1,
            &[
                collection.clone(),
                KeyValue::new("outcome", report.outcome.label()),
            ],
        );
        metrics::cycle_duration_ms().record(started.elapsed().as_secs_f64() * 1000.0, &[collection]);

        report
    }

    async fn cycle(&self, span: &Span) -> CycleReport {
        let mut report = CycleReport::default();
        let timeout = self.config.operation_timeout;

        let session = with_timeout(
            "open session",
            timeout,
            self.store.session(self.config.transactional),
        )
        .await;
        let mut session = match session {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "cannot open store session, skipping cycle");
                report.outcome = CycleOutcome::FetchFailed(e);
                return report;
            }
        };

        let candidates = match self.fetcher.fetch(session.as_mut()).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "candidate fetch failed, skipping cycle");
                report.outcome = CycleOutcome::FetchFailed(e);
                return report;
            }
        };
        report.fetched = candidates.len();
        if candidates.is_empty() {
            return report;
        }

        let won = self.claim_all(session.as_mut(), candidates, span, &mut report).await;

        if let Err(e) = with_timeout("commit", timeout, session.commit()).await {
            error!(error = %e, won = won.len(), "commit failed, claims of this cycle not applied");
            report.outcome = CycleOutcome::CommitFailed(e);
            return report;
        }

        report.claimed = won.iter().map(|item| item.id).collect();
        if won.is_empty() {
            debug!(fetched = report.fetched, "no candidate won");
            report.outcome = CycleOutcome::NoneWon;
            return report;
        }

        report.outcome = self.forward(won).await;
        report
    }

    /// Claim every candidate in order, keeping only the ones won. A fault on
    /// one candidate never stops the rest.
    async fn claim_all(
        &self,
        session: &mut dyn crate::store::StoreSession,
        candidates: Vec<WorkItem>,
        span: &Span,
        report: &mut CycleReport,
    ) -> Vec<WorkItem> {
        let collection = KeyValue::new("collection", self.config.collection.to_string());
        let mut won = Vec::with_capacity(candidates.len());

        for mut item in candidates {
            let result = match self.claimer.claim(session, &mut item).await {
                Ok(true) => {
                    record_claim(
                        span,
                        item.id,
                        self.config.ready_status.as_str(),
                        self.config.owned_status.as_str(),
                    );
                    won.push(item);
                    "won"
                }
                Ok(false) => {
                    debug!(work.id = %item.id, "claim lost");
                    report.lost += 1;
                    "lost"
                }
                Err(e) => {
                    warn!(work.id = %item.id, error = %e, "claim attempt failed, dropping item from cycle");
                    report.faulted += 1;
                    "fault"
                }
            };
            metrics::claim_attempts().add(
                1,
                &[collection.clone(), KeyValue::new("result", result)],
            );
        }

        won
    }

    /// Translate and hand the won batch downstream. Claims are already
    /// committed; nothing here can revert them.
    async fn forward(&self, items: Vec<WorkItem>) -> CycleOutcome {
        let commands = match self.translator.translate(&items) {
            Ok(commands) if commands.len() == items.len() => commands,
            Ok(commands) => {
                let e = Error::Translation(format!(
                    "translator produced {} commands for {} items",
                    commands.len(),
                    items.len()
                ));
                error!(error = %e, "claimed work left unforwarded");
                return CycleOutcome::TranslationFailed(e);
            }
            Err(e) => {
                error!(error = %e, "claimed work left unforwarded");
                return CycleOutcome::TranslationFailed(e);
            }
        };

        let count = commands.len();
        info!(count, "forwarding claimed work");
        metrics::items_forwarded().add(
            count as u64,
            &[KeyValue::new("collection", self.config.collection.to_string())],
        );

        match with_timeout(
            "forward",
            self.config.operation_timeout,
            self.handler.handle(commands),
        )
        .await
        {
            Ok(()) => CycleOutcome::Forwarded,
            Err(e) => {
                error!(error = %e, count, "error processing work");
                CycleOutcome::HandlerFailed(e)
            }
        }
    }
}
