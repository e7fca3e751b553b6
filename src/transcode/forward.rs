// Records -> blocks.
//
// Per record, in stream order:
//   1. nested HTTP head -> canonical object -> DAG-CBOR -> `headers-cid`
//   2. non-empty payload -> raw identifier -> `payload-cid`
//   3. canonicalized record headers + links -> DAG-CBOR header block
//      (always written)
//   4. nested-header block, unless already written
//   5. payload block, unless already written
//
// The links are added to a canonical copy of the headers; the record
// itself is not modified.

use std::io::Write;

use cid::Cid;
use log::{debug, info};

use super::{TranscodeError, TranscodeOptions, TranscodeStats};
use crate::car::{BlockWriter, CarHeader};
use crate::content_id::{Codec, identify};
use crate::dagcbor::encode_headers;
use crate::dedup::DedupTracker;
use crate::headers::{HEADERS_CID, HeaderValue, PAYLOAD_CID, canonicalize};
use crate::warc::Record;

pub struct CarEncoder<W: Write> {
    writer: BlockWriter<W>,
    dedup: DedupTracker,
    opts: TranscodeOptions,
    stats: TranscodeStats,
}

impl<W: Write> CarEncoder<W> {
    /// Start an archive with default options. Writes the archive header.
    pub fn new(output: W) -> Result<Self, TranscodeError> {
        Self::with_options(output, &TranscodeOptions::default())
    }

    pub fn with_options(output: W, opts: &TranscodeOptions) -> Result<Self, TranscodeError> {
        let writer = BlockWriter::new(output, &CarHeader::default())?;
        Ok(Self {
            writer,
            dedup: DedupTracker::new(),
            opts: opts.clone(),
            stats: TranscodeStats::default(),
        })
    }

    /// Transcode one record into its blocks.
    pub fn write_record(&mut self, record: &Record) -> Result<(), TranscodeError> {
        let mut linked = canonicalize(&record.headers);

        let nested = match &record.http {
            Some(head) => {
                let bytes = encode_headers(&head.to_canonical())?;
                let cid = identify(Codec::DagCbor, &bytes);
                linked.insert(HEADERS_CID, HeaderValue::Link(cid));
                Some((cid, bytes))
            }
            None => None,
        };

        let payload_cid = if record.payload.is_empty() {
            None
        } else {
            let cid = identify(Codec::Raw, &record.payload);
            linked.insert(PAYLOAD_CID, HeaderValue::Link(cid));
            Some(cid)
        };

        let header_bytes = encode_headers(&linked)?;
        let header_cid = identify(Codec::DagCbor, &header_bytes);
        self.writer.write_block(&header_cid, &header_bytes)?;
        self.stats.header_blocks += 1;
        debug!(
            "record {}: {} -> {}",
            self.stats.records,
            record.kind().unwrap_or("?"),
            header_cid
        );

        if let Some((cid, bytes)) = nested {
            self.write_content(cid, &bytes)?;
        }
        if let Some(cid) = payload_cid {
            self.write_content(cid, &record.payload)?;
        }

        self.stats.records += 1;
        Ok(())
    }

    fn write_content(&mut self, cid: Cid, bytes: &[u8]) -> Result<(), TranscodeError> {
        if self.opts.dedup && !self.dedup.mark_seen(cid) {
            debug!("  {} already written, skipping {} bytes", cid, bytes.len());
            self.stats.deduplicated += 1;
            return Ok(());
        }
        self.writer.write_block(&cid, bytes)?;
        self.stats.content_blocks += 1;
        Ok(())
    }

    pub fn stats(&self) -> TranscodeStats {
        self.stats
    }

    /// Flush the archive and hand back the sink.
    pub fn finish(mut self) -> Result<(W, TranscodeStats), TranscodeError> {
        self.writer.flush()?;
        info!(
            "wrote {} ({} bytes)",
            self.stats,
            self.writer.bytes_written()
        );
        Ok((self.writer.into_inner(), self.stats))
    }
}
