// src/pipeline.rs
//! Run orchestration: fetch, summarize, reduce, format, persist, deliver.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::digest::{category_headers, format_digest};
use crate::error::{DigestError, Result};
use crate::ledger::ProcessedLedger;
use crate::notify::{DeliveryChannel, SendOutcome};
use crate::store::EntryStore;
use crate::summarize::client::CompletionBackend;
use crate::summarize::reduce::reduce_digest;
use crate::summarize::retry::RetryPolicy;
use crate::summarize::{merge_abstracts, summarize_entries};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest runs started.");
        describe_counter!(
            "digest_empty_runs_total",
            "Runs that found no new entries."
        );
        describe_counter!(
            "digest_failed_runs_total",
            "Runs aborted by an empty stage-2 result."
        );
        describe_counter!(
            "digest_delivery_failures_total",
            "Deliveries that reported failure."
        );
        describe_gauge!(
            "digest_last_run_ts",
            "Unix ts when a digest run last completed."
        );
    });
}

/// Per-invocation knobs.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Lookback override; `None` uses the configured `HOURS_BACK`.
    pub hours_back: Option<u64>,
    /// When false, every step runs except the delivery call.
    pub send: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            hours_back: None,
            send: true,
        }
    }
}

/// What a run produced. `delivery` is `None` when delivery was skipped
/// (no-send mode or a run that found no new entries).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub digest: String,
    pub entry_count: usize,
    pub delivery: Option<SendOutcome>,
    pub ledger_saved: bool,
}

/// Wires the store, the completion backend, the ledger, and the optional
/// delivery channel into the linear run described in [`Self::run`].
pub struct DigestPipeline {
    settings: Settings,
    store: EntryStore,
    ledger: ProcessedLedger,
    backend: Arc<dyn CompletionBackend>,
    channel: Option<Arc<dyn DeliveryChannel>>,
    retry_policy: RetryPolicy,
}

impl DigestPipeline {
    pub fn new(
        settings: Settings,
        backend: Arc<dyn CompletionBackend>,
        channel: Option<Arc<dyn DeliveryChannel>>,
    ) -> Self {
        let store = EntryStore::new(&settings.db_path);
        let ledger = ProcessedLedger::new(&settings.ledger_path);
        Self {
            settings,
            store,
            ledger,
            backend,
            channel,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Runs the digest pipeline once.
    ///
    /// Stages, in order: load ledger, fetch new entries, stage-1 fan-out,
    /// stage-2 reduction, format, persist ledger, deliver. An empty fetch
    /// ends the run early with a no-content report. An empty stage-2 result
    /// aborts with [`DigestError::EmptyDigest`], leaving the ledger untouched
    /// and skipping delivery, so the same entries are retried next run. The
    /// ledger is persisted before delivery: losing a send is acceptable,
    /// paying to summarize the same entries twice is not.
    pub async fn run(&self, opts: RunOptions) -> Result<RunReport> {
        ensure_metrics_described();
        counter!("digest_runs_total").increment(1);

        let hours_back = opts.hours_back.unwrap_or(self.settings.hours_back);
        info!(hours_back, send = opts.send, backend = self.backend.name(), "starting digest run");

        let processed = self.ledger.load();
        let entries = self
            .store
            .fetch_recent(hours_back, processed.clone())
            .await?;

        if entries.is_empty() {
            let message = format!("No entries found in the past {hours_back} hours");
            warn!("{message}");
            counter!("digest_empty_runs_total").increment(1);
            return Ok(RunReport {
                digest: message,
                entry_count: 0,
                delivery: None,
                ledger_saved: false,
            });
        }

        info!(count = entries.len(), "found entries in the lookback window");

        let abstracts = summarize_entries(
            Arc::clone(&self.backend),
            &entries,
            self.retry_policy,
            self.settings.summary_concurrency,
        )
        .await;
        let failed = abstracts.iter().filter(|a| a.is_empty()).count();
        if failed > 0 {
            warn!(
                failed,
                total = abstracts.len(),
                "entries degraded to empty abstracts"
            );
        }

        let merged = merge_abstracts(&abstracts);
        let body = reduce_digest(
            Arc::clone(&self.backend),
            &merged,
            self.settings.target_word_count,
            &self.settings.priority_categories,
        )
        .await;

        if body.trim().is_empty() {
            error!("stage-2 returned no content, aborting run without ledger update");
            counter!("digest_failed_runs_total").increment(1);
            return Err(DigestError::EmptyDigest);
        }

        let digest = format_digest(&body, Local::now());
        let categories = category_headers(&digest);
        info!(?categories, "digest categories in final order");

        let mut updated: HashSet<i64> = processed;
        updated.extend(entries.iter().map(|e| e.id));
        let ledger_saved = match self.ledger.save(&updated) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to persist processed ids, entries may repeat next run");
                false
            }
        };

        let delivery = if opts.send {
            Some(self.deliver(&digest).await)
        } else {
            info!("send disabled, skipping delivery");
            None
        };

        gauge!("digest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(RunReport {
            digest,
            entry_count: entries.len(),
            delivery,
            ledger_saved,
        })
    }

    async fn deliver(&self, digest: &str) -> SendOutcome {
        let Some(channel) = &self.channel else {
            warn!("delivery requested but no channel configured");
            return SendOutcome::failed("delivery channel not configured");
        };

        info!(
            channel = channel.name(),
            chars = digest.chars().count(),
            "delivering digest"
        );
        let outcome = channel.deliver(digest).await;
        if outcome.success {
            info!("digest delivered");
        } else {
            counter!("digest_delivery_failures_total").increment(1);
            error!(error = ?outcome.error, "digest delivery failed");
        }
        outcome
    }
}
