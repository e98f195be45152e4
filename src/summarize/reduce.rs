// src/summarize/reduce.rs
//! Stage-2: one completion call turning the merged abstracts into the final
//! categorized digest body.

use std::sync::Arc;

use tracing::{info, warn};

use super::client::{CompletionBackend, CompletionRequest};

const STAGE2_TEMPERATURE: f32 = 0.5;
const STAGE2_MAX_TOKENS: u32 = 2000;

fn editor_prompt(priority_categories: &[String], target_words: u32) -> String {
    let order_rule = if priority_categories.is_empty() {
        "2. Keep categories in the order their content first appears.".to_string()
    } else {
        format!(
            "2. Put these categories first, in this exact order, when they have \
             content: {}. Append any remaining categories in the order they \
             first appear.",
            priority_categories.join(", ")
        )
    };
    format!(
        "You are a senior news editor compiling a digest. The input is a \
         sequence of delimited article blocks, each holding bullet points \
         already extracted from one article.\n\
         Rules:\n\
         1. Group the points into thematic categories; start every category \
         with a '## ' header line.\n\
         {order_rule}\n\
         3. Merge near-duplicate points into one.\n\
         4. Keep bullets compact and information-dense, with no blank lines \
         between bullets inside a category.\n\
         5. Target about {target_words} words in total.\n\
         Output only the digest body, with no preamble."
    )
}

/// Runs the stage-2 reduction. Single call, no retry. Any failure (empty
/// input, backend error, blank completion) degrades to an empty string; the
/// orchestrator treats an empty result as total failure for the run.
pub async fn reduce_digest(
    backend: Arc<dyn CompletionBackend>,
    merged: &str,
    target_words: u32,
    priority_categories: &[String],
) -> String {
    if merged.trim().is_empty() {
        warn!("stage-2 skipped: no merged abstracts");
        return String::new();
    }

    let req = CompletionRequest {
        system: editor_prompt(priority_categories, target_words),
        user: merged.to_string(),
        temperature: STAGE2_TEMPERATURE,
        max_tokens: STAGE2_MAX_TOKENS,
    };

    match backend.complete(&req).await {
        Ok(text) => {
            info!(chars = text.chars().count(), "stage-2 digest generated");
            text
        }
        Err(e) => {
            warn!(error = %e, "stage-2 reduction failed");
            String::new()
        }
    }
}
