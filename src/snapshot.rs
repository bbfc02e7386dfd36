use std::fmt::Display;
use std::str::FromStr;

use crate::env::{IoResult, WritableFile};

/// Turns key/value pairs into snapshot records and back. Dump and load share
/// one codec instance, so the two halves cannot diverge.
pub trait RecordCodec<K, V>: Send + Sync {
    /// Renders one record, without the trailing newline.
    fn encode(&self, key: &K, value: &V) -> String;

    /// Parses one line; `None` marks a malformed record, which is skipped.
    fn decode(&self, line: &str) -> Option<(K, V)>;
}

/// `<key><delimiter><value>` records, split at the first delimiter.
pub struct DelimitedCodec {
    delimiter: char,
}

impl DelimitedCodec {
    pub fn new(delimiter: char) -> DelimitedCodec {
        DelimitedCodec { delimiter }
    }
}

impl Default for DelimitedCodec {
    fn default() -> DelimitedCodec {
        DelimitedCodec::new(':')
    }
}

impl<K, V> RecordCodec<K, V> for DelimitedCodec
where
    K: Display + FromStr,
    V: Display + FromStr,
{
    fn encode(&self, key: &K, value: &V) -> String {
        format!("{}{}{}", key, self.delimiter, value)
    }

    fn decode(&self, line: &str) -> Option<(K, V)> {
        let (key, value) = line.split_once(self.delimiter)?;
        if key.is_empty() {
            return None;
        }
        let key = key.parse().ok()?;
        let value = value.parse().ok()?;
        Some((key, value))
    }
}

/// Streams newline-terminated records into a writable file.
pub struct SnapshotWriter<W: WritableFile> {
    writer: W,
}

impl<W: WritableFile> SnapshotWriter<W> {
    pub fn new(writer: W) -> SnapshotWriter<W> {
        SnapshotWriter { writer }
    }

    pub fn add_record(&mut self, record: &str) -> IoResult<()> {
        self.writer.append(record.as_bytes())?;
        self.writer.append(b"\n")?;
        Ok(())
    }

    pub fn sync(&mut self) -> IoResult<()> {
        self.writer.flush()?;
        self.writer.sync()
    }
}
