// src/ledger.rs
//! Persistent set of entry ids already folded into a digest.
//!
//! The ledger is a flat JSON array of integers, loaded once per run and
//! overwritten after a successful digest generation. Losing the file means
//! some entries may be summarized twice; it never means losing data.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessedLedger {
    path: PathBuf,
}

impl ProcessedLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted id set. Fails soft: a missing or unreadable or
    /// corrupt file yields an empty set so a lost ledger never blocks a run.
    pub fn load(&self) -> HashSet<i64> {
        match fs::read_to_string(&self.path) {
            Ok(s) => match serde_json::from_str::<Vec<i64>>(&s) {
                Ok(ids) => {
                    debug!(count = ids.len(), path = %self.path.display(), "loaded processed ids");
                    ids.into_iter().collect()
                }
                Err(e) => {
                    warn!(error = %e, path = %self.path.display(), "processed-id file is corrupt, starting empty");
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "cannot read processed-id file, starting empty");
                HashSet::new()
            }
        }
    }

    /// Overwrites the file with the given set, sorted for stable diffs.
    /// Writes to a sibling tmp file first, then renames over the target.
    pub fn save(&self, ids: &HashSet<i64>) -> io::Result<()> {
        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let json = serde_json::to_string(&sorted)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        debug!(count = sorted.len(), path = %self.path.display(), "saved processed ids");
        Ok(())
    }
}
