// ai
//! 🚰📖 Record Source - one line at a time, straight out of the bucket.
//!
//! COLD OPEN - EXT. DATA CENTER - 3:47 AM
//!
//! The object was 400MB of gzip. The table could swallow 5 writes a second.
//! "We don't need to download it all at once," someone whispered. And so the
//! body stream was wrapped in a gzip decoder, the decoder in a `BufReader`,
//! and the lines came out one by one, exactly as fast as the writer could
//! stand them.
//!
//! 🧠 Knowledge graph:
//! - `RecordSource::open()` opens the object every time it's called, so a
//!   source can be replayed from the top. Restartable, like a bad sitcom.
//! - gzip is decoded as a stream with `async-compression`'s `GzipDecoder`,
//!   concatenated members welcome
//! - `\r\n` and `\n` are both stripped; blank lines are skipped
//! - any I/O or UTF-8 error surfaces as an `Err` and ends the reading

use anyhow::{Context, Result};
use async_compression::tokio::bufread::GzipDecoder;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, trace};

use crate::backends::{ObjectReader, ObjectStore};
use crate::common::ObjectLocation;

/// 🪣 Which object to read, and whether it's wearing gzip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceObject {
    pub(crate) location: ObjectLocation,
    pub(crate) decompress: bool,
}

/// 🚰 A replayable source of record lines living in an object store.
#[derive(Debug)]
pub(crate) struct RecordSource<'a, S: ObjectStore> {
    store: &'a S,
    object: SourceObject,
}

impl<'a, S: ObjectStore> RecordSource<'a, S> {
    pub(crate) fn new(store: &'a S, object: SourceObject) -> Self {
        Self { store, object }
    }

    /// 📖 Open the object and hand back a lazy line reader over it.
    ///
    /// Every call re-opens. The previous reader, if any, is none of our business.
    pub(crate) async fn open(&self) -> Result<RecordLines> {
        let location = &self.object.location;
        let body = self
            .store
            .get_object(location)
            .await
            .context(format!("💀 Could not open the record source at {location}"))?;
        debug!("📖 opened {location}, decompress={}", self.object.decompress);

        let reader: ObjectReader = if self.object.decompress {
            let mut decoder = GzipDecoder::new(body);
            decoder.multiple_members(true);
            Box::new(BufReader::new(decoder))
        } else {
            body
        };

        Ok(RecordLines {
            reader,
            location: location.clone(),
            line_number: 0,
            finished: false,
        })
    }
}

/// 📜 Lazy line reader. Yields `Err` at most once, then only `Ok(None)`.
pub(crate) struct RecordLines {
    reader: ObjectReader,
    location: ObjectLocation,
    line_number: u64,
    finished: bool,
}

// 🐛 The boxed reader is a trait object with no Debug. Nobody misses it.
impl std::fmt::Debug for RecordLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLines")
            .field("location", &self.location)
            .field("line_number", &self.line_number)
            .field("finished", &self.finished)
            .finish()
    }
}

impl RecordLines {
    /// 📄 The next non-blank line, `Ok(None)` at the end of the object.
    pub(crate) async fn next_line(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line).await {
                Ok(0) => {
                    trace!("🏁 {} exhausted after {} lines", self.location, self.line_number);
                    self.finished = true;
                    return Ok(None);
                }
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
                    if trimmed.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(trimmed.to_string()));
                }
                Err(err) => {
                    self.finished = true;
                    return Err(anyhow::Error::new(err).context(format!(
                        "💀 Reading {} failed after line {}. Corrupt gzip, or bytes that are not UTF-8.",
                        self.location, self.line_number
                    )));
                }
            }
        }
    }
}
