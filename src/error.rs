// src/error.rs
//! Error taxonomy for the digest pipeline.
//!
//! Only flows that abort a run are variants here. Per-entry summarization
//! failures degrade to empty abstracts inside the stage-1 pool, and delivery
//! failures are reported as [`crate::notify::SendOutcome`] values, so neither
//! appears in this enum.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Debug, Error)]
pub enum DigestError {
    /// The FreshRSS database could not be opened or queried. Raised before
    /// any completion call is made, so a broken store never costs AI budget.
    #[error("entry store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// Stage-2 produced no digest text. The ledger is left untouched and
    /// nothing is delivered; the same entries become eligible next run.
    #[error("digest reduction returned no content")]
    EmptyDigest,

    /// A background task feeding the pipeline panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DigestError {
    /// True when the failure leaves the processed-id ledger unmodified.
    pub fn preserves_ledger(&self) -> bool {
        matches!(self, DigestError::EmptyDigest | DigestError::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_failing_stage() {
        let err = DigestError::EmptyDigest;
        assert!(err.to_string().contains("no content"));
    }

    #[test]
    fn empty_digest_preserves_ledger() {
        assert!(DigestError::EmptyDigest.preserves_ledger());
    }
}
