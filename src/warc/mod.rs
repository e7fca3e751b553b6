// WARC record streams.
//
// `WarcReader` turns a byte stream into `Record`s, splitting the HTTP
// head off protocol records; `WarcWriter` writes them back out.

pub mod reader;
pub mod record;
pub mod writer;

use std::io;

use thiserror::Error;

pub use reader::WarcReader;
pub use record::{HttpHead, Record, START_LINE};
pub use writer::{WARC_VERSION, WarcWriter};

/// Malformed record stream. Every variant names the zero-based record
/// index and the byte offset where that record starts.
#[derive(Debug, Error)]
pub enum WarcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("record {record} at offset {offset}: invalid version line {line:?}")]
    InvalidVersion { record: u64, offset: u64, line: String },
    #[error("record {record} at offset {offset}: malformed header line {line:?}")]
    MalformedHeader { record: u64, offset: u64, line: String },
    #[error("record {record} at offset {offset}: header is not valid UTF-8")]
    NotUtf8 { record: u64, offset: u64 },
    #[error("record {record} at offset {offset}: missing {field} header")]
    MissingField {
        record: u64,
        offset: u64,
        field: &'static str,
    },
    #[error("record {record} at offset {offset}: invalid Content-Length {value:?}")]
    InvalidContentLength {
        record: u64,
        offset: u64,
        value: String,
    },
    #[error("record {record} at offset {offset}: truncated")]
    Truncated { record: u64, offset: u64 },
}
