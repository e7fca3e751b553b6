// Bidirectional WARC ⇄ CAR transcoding.
//
// Forward (`CarEncoder`): every record becomes one DAG-CBOR header
// block, plus a DAG-CBOR block for its HTTP head and a raw block for its
// payload. The header block links to the other two through `headers-cid`
// and `payload-cid`. Nested-header and payload blocks are written once
// per distinct identifier.
//
// Reverse (`CarDecoder`): a single scan of the block stream rebuilds
// records in header-block order, resolving links against every block
// seen so far.

pub mod forward;
pub mod reverse;

use std::fmt;
use std::io::{self, BufRead, Read, Write};

use cid::Cid;
use thiserror::Error;

use crate::car::CarError;
use crate::dagcbor::{DecodeError, EncodeError};
use crate::warc::{WarcError, WarcReader, WarcWriter};

pub use forward::CarEncoder;
pub use reverse::CarDecoder;

// ---------------------------------------------------------------------------
// Options and statistics
// ---------------------------------------------------------------------------

/// Configuration for the forward direction.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Write each distinct nested-header / payload block only once.
    pub dedup: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self { dedup: true }
    }
}

/// Counters for one transcoding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Logical records written (forward) or reconstructed (reverse).
    pub records: u64,
    /// DAG-CBOR record header blocks.
    pub header_blocks: u64,
    /// Nested-header and payload blocks.
    pub content_blocks: u64,
    /// Forward: blocks skipped as already written. Reverse: references
    /// satisfied by a block an earlier record already used.
    pub deduplicated: u64,
}

impl TranscodeStats {
    /// Total blocks, not counting the archive header.
    pub fn blocks(&self) -> u64 {
        self.header_blocks + self.content_blocks
    }
}

impl fmt::Display for TranscodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} header blocks, {} content blocks, {} deduplicated",
            self.records, self.header_blocks, self.content_blocks, self.deduplicated
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("WARC: {0}")]
    Warc(#[from] WarcError),
    #[error("CAR: {0}")]
    Car(#[from] CarError),
    #[error("cannot encode header object: {0}")]
    Encode(#[from] EncodeError),
    #[error("record {record}: block {cid}: cannot decode header object: {source}")]
    Decode {
        record: u64,
        cid: Cid,
        source: DecodeError,
    },
    #[error("record {record}: nested header block {cid} has no start line")]
    MissingStartLine { record: u64, cid: Cid },
    #[error("record {record}: {field} {cid} never appears in the archive")]
    DanglingReference {
        record: u64,
        field: &'static str,
        cid: Cid,
    },
}

// ---------------------------------------------------------------------------
// Whole-stream helpers
// ---------------------------------------------------------------------------

/// Transcode a WARC stream into a CAR stream with default options.
pub fn warc_to_car<R: BufRead, W: Write>(
    input: R,
    output: W,
) -> Result<TranscodeStats, TranscodeError> {
    warc_to_car_with_options(input, output, &TranscodeOptions::default())
}

/// Transcode a WARC stream into a CAR stream.
pub fn warc_to_car_with_options<R: BufRead, W: Write>(
    input: R,
    output: W,
    opts: &TranscodeOptions,
) -> Result<TranscodeStats, TranscodeError> {
    let mut encoder = CarEncoder::with_options(output, opts)?;
    for record in WarcReader::new(input) {
        encoder.write_record(&record?)?;
    }
    let (_, stats) = encoder.finish()?;
    Ok(stats)
}

/// Transcode a CAR stream back into a WARC stream.
pub fn car_to_warc<R: Read, W: Write>(input: R, output: W) -> Result<TranscodeStats, TranscodeError> {
    let mut decoder = CarDecoder::new(input)?;
    let mut writer = WarcWriter::new(output);
    while let Some(record) = decoder.next_record()? {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(decoder.stats())
}
