//! 📜 Records - the line-delimited JSON that goes in and comes out.
//!
//! 🚰 `source` turns an object (gzipped or not) into a lazy stream of lines.
//! 📤 `export` goes the other way: a key → value mapping becomes a gzipped
//! line-delimited object in one of two shapes.
//!
//! Both ends share the same framing: one JSON object per `\n`-terminated line,
//! gzip around the whole thing. Symmetry. The duck approves. 🦆

mod export;
mod source;

pub use export::{ExportFormat, ExportTarget};
pub(crate) use export::export_records;
pub(crate) use source::{RecordSource, SourceObject};
