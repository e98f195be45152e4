// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod sanitize;
pub mod store;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::error::{DigestError, Result};
pub use crate::pipeline::{DigestPipeline, RunOptions, RunReport};
pub use crate::store::{Entry, EntryStore};
