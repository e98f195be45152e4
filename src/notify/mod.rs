// src/notify/mod.rs
//! Outbound delivery seam.

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Result of one delivery attempt. A failed send is reported, never raised:
/// the pipeline decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Seam over the outbound messaging channel.
#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Delivers `text`, splitting it into channel-sized chunks when needed.
    /// Transport failures come back inside the outcome.
    async fn deliver(&self, text: &str) -> SendOutcome;
    fn name(&self) -> &'static str;
}
