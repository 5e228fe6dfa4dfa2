//! JSON-lines log of crop decisions, one line per emitted frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use reframe_media::CropDecision;

use crate::error::{WorkerError, WorkerResult};

pub struct DecisionLog<W: Write> {
    writer: W,
    lines: u64,
}

impl DecisionLog<BufWriter<File>> {
    /// Create (or truncate) the log file.
    pub fn create(path: &Path) -> WorkerResult<Self> {
        let file = File::create(path).map_err(|source| WorkerError::Open {
            what: "decision log",
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DecisionLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub fn record(&mut self, decision: &CropDecision) -> WorkerResult<()> {
        serde_json::to_writer(&mut self.writer, decision)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> WorkerResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
