//! # Append-Only Audit Log
//!
//! Durable JSON-lines log wrapping the hash chain. The file is the source
//! of truth; the in-memory entry cache is rebuilt from it on open.
//!
//! ## Format
//!
//! UTF-8 text, one JSON object per line:
//!
//! ```text
//! {"entry_hash":"…","previous_hash":"…","timestamp":1722.5,"data":{…}}
//! ```
//!
//! ## Failure policy
//!
//! A malformed line discovered on open does not abort the process: the log
//! finishes loading the well-formed entries, marks itself quarantined, and
//! from then on `verify_integrity` reports false and `append` refuses with
//! [`LedgerError::Quarantined`] until the operator repairs the file and
//! reopens. (The permissive alternative - keep appending onto a broken
//! chain - would bury the evidence under fresh entries.)
//!
//! ## Durability
//!
//! With durability enabled (the default) every append is flushed and
//! fsynced before it returns. An append that has started is never torn:
//! callers serialize appends externally, and the entry is written as a
//! single line.

use crate::chain::{ChainVerification, HashChain, LogEntry};
use crate::error::LedgerError;
use crate::Result;
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, warn};

/// Hash-chained append-only log backed by a JSON-lines file.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Option<File>,
    chain: HashChain,
    entries: Vec<LogEntry>,
    load_error: bool,
    durable: bool,
}

impl AuditLog {
    /// Opens (or creates) a log at `path` with durability enabled.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_durability(path, true)
    }

    /// Opens (or creates) a log, controlling fsync-per-append.
    pub fn with_durability(path: impl Into<PathBuf>, durable: bool) -> Result<Self> {
        let path = path.into();

        let mut log = Self {
            path,
            file: None,
            chain: HashChain::new(),
            entries: Vec::new(),
            load_error: false,
            durable,
        };

        if log.path.exists() {
            log.load_existing()?;
        } else if let Some(parent) = log.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        log.file = Some(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&log.path)?,
        );

        Ok(log)
    }

    /// The file backing this log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a payload and returns the new entry hash.
    ///
    /// Non-object payloads are wrapped as `{"data": <payload>}`. If the
    /// payload carries a numeric `timestamp` field it is honored; otherwise
    /// the wall clock supplies one.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Quarantined`] when the log loaded with errors;
    /// [`LedgerError::Io`] when the line cannot be written. On a write
    /// failure neither the chain head nor the cache advances.
    pub fn append(&mut self, payload: Value) -> Result<String> {
        if self.load_error {
            return Err(LedgerError::Quarantined);
        }

        let data = match payload {
            Value::Object(_) => payload,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("data".to_string(), other);
                Value::Object(wrapped)
            }
        };

        let timestamp = data
            .get("timestamp")
            .and_then(Value::as_f64)
            .unwrap_or_else(now_seconds);

        let previous_hash = self.chain.current_hash().to_string();
        let entry_hash = HashChain::compute_entry_hash(&previous_hash, &data, timestamp);

        let entry = LogEntry {
            entry_hash: entry_hash.clone(),
            previous_hash,
            timestamp,
            data,
        };

        self.write_line(&entry)?;

        self.chain.advance_to(&entry.entry_hash);
        self.entries.push(entry);

        Ok(entry_hash)
    }

    /// Verifies the whole chain. False when quarantined.
    pub fn verify_integrity(&self) -> bool {
        if self.load_error {
            return false;
        }
        HashChain::verify_chain(&self.entries).is_valid
    }

    /// Full verification report, including the first bad index.
    pub fn verification(&self) -> ChainVerification {
        if self.load_error {
            return ChainVerification {
                is_valid: false,
                first_invalid: None,
            };
        }
        HashChain::verify_chain(&self.entries)
    }

    /// Half-open slice `[start, end)` of the entry cache; `None` runs to
    /// the end. Out-of-range bounds clamp instead of panicking.
    pub fn get_entries(&self, start: usize, end: Option<usize>) -> &[LogEntry] {
        let len = self.entries.len();
        let start = start.min(len);
        let end = end.unwrap_or(len).min(len).max(start);
        &self.entries[start..end]
    }

    /// Finds an entry by its hash.
    pub fn get_entry_by_hash(&self, entry_hash: &str) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.entry_hash == entry_hash)
    }

    /// Linear scan for entries whose `data` matches every criterion
    /// exactly.
    pub fn search(&self, criteria: &Map<String, Value>) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                criteria
                    .iter()
                    .all(|(key, expected)| entry.data.get(key) == Some(expected))
            })
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether loading found malformed lines.
    pub fn has_load_error(&self) -> bool {
        self.load_error
    }

    /// Flushes buffered writes to the operating system.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }

    /// Flushes and releases the file handle. Further appends fail with an
    /// I/O error until the log is reopened.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn write_line(&mut self, entry: &LogEntry) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "log file is closed",
            ))
        })?;

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        if self.durable {
            file.sync_all()?;
        }
        Ok(())
    }

    fn load_existing(&mut self) -> Result<()> {
        let reader = BufReader::new(File::open(&self.path)?);

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => {
                    self.chain.advance_to(&entry.entry_hash);
                    self.entries.push(entry);
                }
                Err(e) => {
                    error!(
                        path = %self.path.display(),
                        line = line_number + 1,
                        error = %e,
                        "malformed log line; quarantining log"
                    );
                    self.load_error = true;
                }
            }
        }

        if !self.verify_integrity() {
            warn!(path = %self.path.display(), "log integrity verification failed on load");
        }

        Ok(())
    }
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
