// src/notify/telegram.rs
//! Digest delivery through the Telegram Bot API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{DeliveryChannel, SendOutcome};

/// Telegram caps messages at 4096 characters; the working threshold stays
/// under that to leave headroom for markup expansion.
pub const MESSAGE_CHAR_LIMIT: usize = 4000;

const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    chat_id: String,
    parse_mode: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("freshrss-digest/0.1")
                .connect_timeout(Duration::from_secs(4))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            api_url: format!("https://api.telegram.org/bot{bot_token}/sendMessage"),
            chat_id: chat_id.into(),
            parse_mode: Some("Markdown".to_string()),
        }
    }

    /// Builds from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`. Returns `None`
    /// when either is missing so the pipeline can run with delivery left
    /// unconfigured.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var(ENV_BOT_TOKEN).ok()?;
        let chat_id = std::env::var(ENV_CHAT_ID).ok()?;
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return None;
        }
        Some(Self::new(&token, chat_id))
    }

    /// `None` sends plain text; the default is "Markdown".
    pub fn with_parse_mode(mut self, parse_mode: Option<String>) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    async fn send_one(&self, text: &str) -> SendOutcome {
        #[derive(Serialize)]
        struct SendMessage<'a> {
            chat_id: &'a str,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'a str>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            ok: bool,
            description: Option<String>,
        }

        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: self.parse_mode.as_deref(),
        };

        let resp = match self.client.post(&self.api_url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let msg = format!("Error sending Telegram message: {e}");
                error!(error = %e, "telegram request failed");
                return SendOutcome::failed(msg);
            }
        };

        match resp.json::<ApiResponse>().await {
            Ok(api) if api.ok => SendOutcome::ok(),
            Ok(api) => {
                let msg = format!(
                    "Failed to send Telegram message: {}",
                    api.description
                        .unwrap_or_else(|| "Unknown error".to_string())
                );
                error!(%msg, "telegram rejected message");
                SendOutcome::failed(msg)
            }
            Err(e) => {
                let msg = format!("Error sending Telegram message: {e}");
                error!(error = %e, "telegram response unreadable");
                SendOutcome::failed(msg)
            }
        }
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for TelegramNotifier {
    async fn deliver(&self, text: &str) -> SendOutcome {
        let total = text.chars().count();
        if total <= MESSAGE_CHAR_LIMIT {
            debug!(chars = total, "sending digest as a single message");
            return self.send_one(text).await;
        }

        let chunks = split_message(text, MESSAGE_CHAR_LIMIT);
        info!(
            chars = total,
            chunks = chunks.len(),
            "digest exceeds channel limit, sending in chunks"
        );

        let mut last = SendOutcome::failed("No content to send");
        for (i, chunk) in chunks.iter().enumerate() {
            let outcome = self.send_one(chunk).await;
            if !outcome.success {
                error!(chunk = i + 1, error = ?outcome.error, "chunk delivery failed");
            }
            last = outcome;
        }
        last
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Splits `text` into chunks of at most `limit` characters, breaking only at
/// paragraph boundaries (`\n\n`) and preserving paragraph order. A single
/// paragraph longer than the limit becomes its own oversized chunk rather
/// than being split mid-paragraph.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for paragraph in text.split("\n\n") {
        let para_chars = paragraph.chars().count();
        if current.is_empty() {
            current = paragraph.to_string();
            current_chars = para_chars;
        } else if current_chars + para_chars + 2 <= limit {
            current.push_str("\n\n");
            current.push_str(paragraph);
            current_chars += para_chars + 2;
        } else {
            chunks.push(current);
            current = paragraph.to_string();
            current_chars = para_chars;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_message("short paragraph", 4000);
        assert_eq!(chunks, vec!["short paragraph".to_string()]);
    }

    #[test]
    fn long_body_splits_at_paragraph_breaks() {
        let paragraph = "x".repeat(198);
        let paragraphs = vec![paragraph.clone(); 45];
        let text = paragraphs.join("\n\n");
        assert!(text.chars().count() > 8900);

        let chunks = split_message(&text, MESSAGE_CHAR_LIMIT);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= MESSAGE_CHAR_LIMIT);
            // no paragraph was split mid-way
            for piece in chunk.split("\n\n") {
                assert_eq!(piece, paragraph);
            }
        }
        // order and content preserved
        let recombined: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.split("\n\n"))
            .collect();
        assert_eq!(recombined.len(), 45);
    }

    #[test]
    fn oversized_paragraph_becomes_its_own_chunk() {
        let huge = "y".repeat(5000);
        let text = format!("intro\n\n{huge}\n\noutro");
        let chunks = split_message(&text, 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "intro");
        assert_eq!(chunks[1].chars().count(), 5000);
        assert_eq!(chunks[2], "outro");
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 3 chars but 6 bytes per paragraph
        let text = "ééé\n\nééé";
        let chunks = split_message(text, 8);
        assert_eq!(chunks.len(), 1, "3 + 3 + 2 chars fit in an 8-char limit");
    }

    #[test]
    #[serial]
    fn from_env_requires_both_variables() {
        std::env::remove_var(ENV_BOT_TOKEN);
        std::env::remove_var(ENV_CHAT_ID);
        assert!(TelegramNotifier::from_env().is_none());

        std::env::set_var(ENV_BOT_TOKEN, "123:abc");
        assert!(TelegramNotifier::from_env().is_none());

        std::env::set_var(ENV_CHAT_ID, "42");
        let notifier = TelegramNotifier::from_env().expect("both vars set");
        assert!(notifier.api_url.contains("bot123:abc"));

        std::env::remove_var(ENV_BOT_TOKEN);
        std::env::remove_var(ENV_CHAT_ID);
    }
}
