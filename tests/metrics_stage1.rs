// tests/metrics_stage1.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use freshrss_digest::store::Entry;
use freshrss_digest::summarize::client::{CompletionBackend, CompletionRequest};
use freshrss_digest::summarize::retry::RetryPolicy;
use freshrss_digest::summarize::summarize_entries;
use metrics_exporter_prometheus::PrometheusBuilder;

struct HalfFailingBackend;

#[async_trait::async_trait]
impl CompletionBackend for HalfFailingBackend {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
        if req.user.contains("Title: bad") {
            bail!("scripted failure")
        }
        Ok("- bullet".to_string())
    }
    fn name(&self) -> &'static str {
        "half-failing"
    }
}

fn entry(id: i64, title: &str) -> Entry {
    Entry {
        id,
        title: title.to_string(),
        author: None,
        content: "body".to_string(),
        raw_content: String::new(),
        link: String::new(),
        published_at: Utc::now(),
        category: "Uncategorized".to_string(),
        feed_name: "Wire".to_string(),
    }
}

#[tokio::test]
async fn stage1_series_present_after_a_run() {
    // Install a local recorder for the test
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder().expect("recorder");

    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        jitter: Duration::ZERO,
    };
    let backend = Arc::new(HalfFailingBackend);
    let entries = vec![entry(1, "good"), entry(2, "bad")];
    let abstracts = summarize_entries(backend, &entries, policy, 2).await;
    assert_eq!(abstracts.len(), 2);

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    assert!(out.contains("digest_stage1_entries_total"));
    assert!(out.contains("digest_stage1_failures_total"));
}
