// src/summarize/mod.rs
//! Two-stage summarization: a bounded concurrent per-entry extraction pass
//! (stage 1, this module) and a single reduction call (stage 2, `reduce`).

pub mod client;
pub mod reduce;
pub mod retry;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::store::Entry;
use client::{CompletionBackend, CompletionRequest};
use retry::{retry, RetryPolicy};

/// One-time metrics registration (so series show up on a recorder).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_stage1_entries_total",
            "Entries submitted to stage-1 summarization."
        );
        describe_counter!(
            "digest_stage1_failures_total",
            "Entries whose stage-1 retries were exhausted."
        );
        describe_counter!(
            "digest_completion_errors_total",
            "Failed completion-service calls."
        );
        describe_histogram!(
            "digest_completion_ms",
            "Completion-service call latency in milliseconds."
        );
    });
}

/// Stage-1 output for one entry. `source_index` is the 1-based position in
/// the input batch; it drives order restoration after the concurrent pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleAbstract {
    pub source_index: usize,
    pub title: String,
    pub feed_name: String,
    /// Extracted bullet lines; empty when every attempt failed.
    pub bullets: String,
}

impl ArticleAbstract {
    pub fn is_empty(&self) -> bool {
        self.bullets.trim().is_empty()
    }
}

const STAGE1_SYSTEM_PROMPT: &str =
    "You are a news wire editor. You extract the core facts from one article at a time.";
const STAGE1_TEMPERATURE: f32 = 0.3;
const STAGE1_MAX_TOKENS: u32 = 1000;

fn stage1_user_prompt(entry: &Entry) -> String {
    format!(
        "Read the following article and extract 1-4 one-line bullet points, \
         most important first. Each bullet must be at most 50 characters, \
         state a fact taken from the article (no fabrication), and skip \
         boilerplate such as subscription notes or self-promotion.\n\n\
         Title: {}\nSource: {}\n\nArticle:\n{}",
        entry.title, entry.feed_name, entry.content
    )
}

/// Produces one abstract per entry, in input order, without ever failing the
/// batch: an entry whose retries are exhausted comes back with empty bullets.
///
/// Fan-out is bounded by `max_concurrency` semaphore permits. Each task owns
/// exactly one result slot, so completion order never affects output order.
pub async fn summarize_entries(
    backend: Arc<dyn CompletionBackend>,
    entries: &[Entry],
    policy: RetryPolicy,
    max_concurrency: usize,
) -> Vec<ArticleAbstract> {
    ensure_metrics_described();
    if entries.is_empty() {
        return Vec::new();
    }

    counter!("digest_stage1_entries_total").increment(entries.len() as u64);

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        let backend = Arc::clone(&backend);
        let semaphore = Arc::clone(&semaphore);
        let title = entry.title.clone();
        let feed_name = entry.feed_name.clone();
        let user = stage1_user_prompt(entry);
        let entry_id = entry.id;

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore open");
            let req = CompletionRequest {
                system: STAGE1_SYSTEM_PROMPT.to_string(),
                user,
                temperature: STAGE1_TEMPERATURE,
                max_tokens: STAGE1_MAX_TOKENS,
            };
            let bullets = match retry(&policy, "stage1", || backend.complete(&req)).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(entry_id, error = %e, "stage-1 retries exhausted, entry degraded to empty abstract");
                    counter!("digest_stage1_failures_total").increment(1);
                    String::new()
                }
            };
            ArticleAbstract {
                source_index: idx + 1,
                title,
                feed_name,
                bullets,
            }
        });
        handles.push((idx, handle));
    }

    // One slot per input index, each written by exactly one task.
    let mut slots: Vec<Option<ArticleAbstract>> = Vec::with_capacity(entries.len());
    slots.resize_with(entries.len(), || None);

    for (idx, handle) in handles {
        match handle.await {
            Ok(abs) => slots[idx] = Some(abs),
            Err(e) => {
                warn!(index = idx, error = %e, "stage-1 task join failed");
                counter!("digest_stage1_failures_total").increment(1);
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| ArticleAbstract {
                source_index: idx + 1,
                title: entries[idx].title.clone(),
                feed_name: entries[idx].feed_name.clone(),
                bullets: String::new(),
            })
        })
        .collect()
}

/// Concatenates abstracts into the stage-2 input blob. Blocks keep input
/// order and carry explicit delimiters so the reducer can attribute content
/// back to its source article.
pub fn merge_abstracts(abstracts: &[ArticleAbstract]) -> String {
    let blocks: Vec<String> = abstracts
        .iter()
        .map(|a| {
            format!(
                "<<<ARTICLE {idx}>>>\nTitle: {title}\nSource: {feed}\n{bullets}\n<<<END ARTICLE {idx}>>>",
                idx = a.source_index,
                title = a.title,
                feed = a.feed_name,
                bullets = a.bullets,
            )
        })
        .collect();
    blocks.join("\n\n")
}
