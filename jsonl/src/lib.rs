//! JSON-lines event source backend.
//!
//! The producing services export their outbox into an append-only text
//! file, one event envelope per line. [`JsonlSource`] reads that file
//! lazily through a buffered reader, so logs far larger than memory
//! replay fine.
//!
//! Semantics carried over from the export format:
//!
//! - blank and whitespace-only lines are skipped, not errors
//! - an unopenable file or an unparseable line is a fatal
//!   [`SourceError`]; the run aborts with no partial verdict
//! - hitting end-of-file is not terminal: if the file has grown since,
//!   the next pull picks up the appended lines, which is what the
//!   continuous runner relies on to tail a live export

use reconcile_core::envelope::EventEnvelope;
use reconcile_core::source::{EventSource, SourceError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lazy, forward-only source over an append-only JSONL export file.
#[derive(Debug)]
pub struct JsonlSource {
    path: PathBuf,
    reader: BufReader<File>,
    /// 1-based line number of the last line read, for diagnostics.
    line: u64,
}

impl JsonlSource {
    /// Opens the export file for reading from the beginning.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        debug!(path = %path.display(), "opened event log");
        Ok(Self {
            path,
            reader: BufReader::new(file),
            line: 0,
        })
    }

    /// The export file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based number of the last line read.
    #[must_use]
    pub const fn line(&self) -> u64 {
        self.line
    }
}

impl EventSource for JsonlSource {
    fn next_event(&mut self) -> Result<Option<EventEnvelope>, SourceError> {
        let mut buf = String::new();
        loop {
            buf.clear();
            let read = self.reader.read_line(&mut buf)?;
            if read == 0 {
                // Caught up with the end of the export. The file may grow.
                return Ok(None);
            }
            self.line += 1;

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str::<EventEnvelope>(trimmed)
                .map(Some)
                .map_err(|e| SourceError::Malformed {
                    line: self.line,
                    reason: e.to_string(),
                });
        }
    }
}
