use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Page metadata carried next to the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub id: String,
    pub title: String,
}

/// One output record: `{"text": ..., "meta": {"id": ..., "title": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedItem {
    pub text: String,
    pub meta: Meta,
}

/// Line-delimited JSON writer. Non-ASCII text is written as UTF-8, not
/// `\u` escapes.
pub struct JsonlSink<W: Write> {
    writer: BufWriter<W>,
    written: usize,
}

impl JsonlSink<File> {
    /// Open `path` for appending, creating it if missing. Existing records
    /// are left in place.
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        JsonlSink {
            writer: BufWriter::with_capacity(256 * 1024, writer),
            written: 0,
        }
    }

    pub fn write(&mut self, item: &AcceptedItem) -> Result<()> {
        serde_json::to_writer(&mut self.writer, item)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Records written through this sink.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
