// Blocks -> records.
//
// State for one scan:
//   pending   header blocks in arrival order, each waiting on 0..=2 links
//   resolved  identifier -> bytes for every block read so far
//
// Classification of an incoming block:
//   raw                                   -> content
//   DAG-CBOR awaited by a pending record  -> content (nested header object)
//   DAG-CBOR with a `:start-line` field   -> content (nested header object)
//   DAG-CBOR with a `warc-type` field     -> new record
//   anything else                         -> content, kept for later headers
//
// Header blocks are resolvable too, so a link to one never dangles.
//
// The front record is emitted as soon as its links resolve. Content blocks
// are never evicted: a later revisit may point at a payload an earlier
// record already consumed.

use std::collections::{HashMap, VecDeque};
use std::io::Read;

use cid::Cid;
use log::{debug, info, trace, warn};

use super::{TranscodeError, TranscodeStats};
use crate::car::{Block, BlockReader};
use crate::content_id::Codec;
use crate::dagcbor::decode_headers;
use crate::dedup::DedupTracker;
use crate::headers::{CanonicalHeaders, HEADERS_CID, PAYLOAD_CID};
use crate::warc::{HttpHead, Record, START_LINE};

/// A header block waiting for its links to resolve.
struct PendingRecord {
    index: u64,
    headers: CanonicalHeaders,
    nested: Option<Cid>,
    payload: Option<Cid>,
}

impl PendingRecord {
    fn awaits(&self, cid: &Cid) -> bool {
        self.nested.as_ref() == Some(cid) || self.payload.as_ref() == Some(cid)
    }
}

pub struct CarDecoder<R: Read> {
    reader: BlockReader<R>,
    pending: VecDeque<PendingRecord>,
    resolved: HashMap<Cid, Vec<u8>>,
    /// Content identifiers present in `resolved`.
    materialized: DedupTracker,
    /// Content identifiers already attached to an emitted record.
    claimed: DedupTracker,
    opened: u64,
    stats: TranscodeStats,
    exhausted: bool,
    failed: bool,
}

impl<R: Read> CarDecoder<R> {
    /// Open a CAR stream. Reads and checks the archive header.
    pub fn new(input: R) -> Result<Self, TranscodeError> {
        let reader = BlockReader::new(input)?;
        Ok(Self {
            reader,
            pending: VecDeque::new(),
            resolved: HashMap::new(),
            materialized: DedupTracker::new(),
            claimed: DedupTracker::new(),
            opened: 0,
            stats: TranscodeStats::default(),
            exhausted: false,
            failed: false,
        })
    }

    pub fn stats(&self) -> TranscodeStats {
        self.stats
    }

    /// Next reconstructed record, in header-block order. `Ok(None)` once
    /// the stream is exhausted and every record was emitted. After an
    /// error the decoder yields nothing more.
    pub fn next_record(&mut self) -> Result<Option<Record>, TranscodeError> {
        if self.failed {
            return Ok(None);
        }
        let result = self.advance();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<Record>, TranscodeError> {
        loop {
            if self.front_ready() {
                if let Some(pending) = self.pending.pop_front() {
                    return self.assemble(pending).map(Some);
                }
            }

            if self.exhausted {
                return match self.pending.front() {
                    Some(front) => Err(self.dangling(front)),
                    None => {
                        self.log_summary();
                        Ok(None)
                    }
                };
            }

            match self.reader.next_block()? {
                Some(block) => self.ingest(block),
                None => self.exhausted = true,
            }
        }
    }

    fn front_ready(&self) -> bool {
        self.pending.front().is_some_and(|p| {
            p.nested.iter().chain(p.payload.iter()).all(|cid| self.resolved.contains_key(cid))
        })
    }

    fn ingest(&mut self, block: Block) {
        match block.codec() {
            Some(Codec::Raw) => self.retain(block),
            Some(Codec::DagCbor) => {
                if self.pending.iter().any(|p| p.awaits(&block.cid)) {
                    return self.retain(block);
                }
                match decode_headers(&block.data) {
                    Ok(headers) if headers.get(START_LINE).is_some() => self.retain(block),
                    Ok(headers) if headers.get("warc-type").is_some() => self.open(block, headers),
                    Ok(_) => self.retain(block),
                    Err(e) => {
                        trace!("block {} is not a header object ({}), keeping as content", block.cid, e);
                        self.retain(block)
                    }
                }
            }
            None => {
                warn!(
                    "block {} has unknown codec 0x{:x}, keeping as content",
                    block.cid,
                    block.cid.codec()
                );
                self.retain(block)
            }
        }
    }

    fn open(&mut self, block: Block, headers: CanonicalHeaders) {
        let Block { cid, data } = block;
        let pending = PendingRecord {
            index: self.opened,
            nested: headers.link(HEADERS_CID),
            payload: headers.link(PAYLOAD_CID),
            headers,
        };
        debug!(
            "record {}: header block {} ({} links)",
            pending.index,
            cid,
            pending.nested.iter().count() + pending.payload.iter().count()
        );
        self.pending.push_back(pending);
        self.opened += 1;
        self.stats.header_blocks += 1;
        self.resolved.entry(cid).or_insert(data);
    }

    fn retain(&mut self, block: Block) {
        self.stats.content_blocks += 1;
        if !self.materialized.mark_seen(block.cid) {
            warn!("content block {} appears more than once", block.cid);
            return;
        }
        trace!("content block {} ({} bytes)", block.cid, block.data.len());
        self.resolved.insert(block.cid, block.data);
    }

    fn assemble(&mut self, pending: PendingRecord) -> Result<Record, TranscodeError> {
        let PendingRecord {
            index,
            mut headers,
            nested,
            payload,
        } = pending;

        let http = match nested {
            Some(cid) => {
                let bytes = self.resolved_bytes(index, HEADERS_CID, cid)?;
                let canonical =
                    decode_headers(bytes).map_err(|source| TranscodeError::Decode {
                    record: index,
                    cid,
                    source,
                })?;
                let head = HttpHead::from_canonical(&canonical)
                    .ok_or(TranscodeError::MissingStartLine { record: index, cid })?;
                self.claim(cid);
                headers.remove(HEADERS_CID);
                Some(head)
            }
            None => None,
        };

        let body = match payload {
            Some(cid) => {
                let bytes = self.resolved_bytes(index, PAYLOAD_CID, cid)?.to_vec();
                self.claim(cid);
                headers.remove(PAYLOAD_CID);
                bytes
            }
            None => Vec::new(),
        };

        self.stats.records += 1;
        debug!("record {}: emitted ({} payload bytes)", index, body.len());
        Ok(Record {
            headers: headers.to_header_map(),
            http,
            payload: body,
        })
    }

    fn resolved_bytes(&self, record: u64, field: &'static str, cid: Cid) -> Result<&[u8], TranscodeError> {
        self.resolved
            .get(&cid)
            .map(Vec::as_slice)
            .ok_or(TranscodeError::DanglingReference { record, field, cid })
    }

    fn claim(&mut self, cid: Cid) {
        if !self.claimed.mark_seen(cid) {
            self.stats.deduplicated += 1;
        }
    }

    fn dangling(&self, front: &PendingRecord) -> TranscodeError {
        let missing = [(HEADERS_CID, front.nested), (PAYLOAD_CID, front.payload)]
            .into_iter()
            .find_map(|(field, cid)| cid.filter(|c| !self.resolved.contains_key(c)).map(|c| (field, c)));
        match missing {
            Some((field, cid)) => TranscodeError::DanglingReference {
                record: front.index,
                field,
                cid,
            },
            // Unreachable: a front record with every link resolved is
            // emitted before the exhausted check.
            None => TranscodeError::Io(std::io::Error::other("pending record with no missing link")),
        }
    }

    fn log_summary(&self) {
        let unclaimed = self.materialized.len().saturating_sub(self.claimed.len());
        if unclaimed > 0 {
            warn!("{} content blocks were not referenced by any record", unclaimed);
        }
        info!("read {}", self.stats);
    }
}

impl<R: Read> Iterator for CarDecoder<R> {
    type Item = Result<Record, TranscodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::{BlockWriter, CarHeader};
    use crate::dagcbor::encode_headers;
    use crate::headers::{HeaderValue, canonicalize};

    fn header_block(fields: &[(&str, &str)], links: &[(&str, Cid)]) -> Vec<u8> {
        let mut h = canonicalize(&fields.iter().copied().collect());
        for (name, cid) in links {
            h.insert(*name, HeaderValue::Link(*cid));
        }
        encode_headers(&h).unwrap()
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Record>, TranscodeError> {
        CarDecoder::new(bytes)?.collect()
    }

    #[test]
    fn payload_before_header_still_resolves() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let payload = w.put(Codec::Raw, b"early").unwrap();
        let header = header_block(&[("WARC-Type", "resource")], &[(PAYLOAD_CID, payload)]);
        w.put(Codec::DagCbor, &header).unwrap();

        let records = decode_all(&w.into_inner()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, b"early");
        assert!(!records[0].headers.contains(PAYLOAD_CID));
    }

    #[test]
    fn one_block_serves_many_records() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let cid = crate::content_id::identify(Codec::Raw, b"shared");
        let header = header_block(&[("WARC-Type", "response")], &[(PAYLOAD_CID, cid)]);
        w.put(Codec::DagCbor, &header).unwrap();
        w.write_block(&cid, b"shared").unwrap();
        let revisit = header_block(&[("WARC-Type", "revisit")], &[(PAYLOAD_CID, cid)]);
        w.put(Codec::DagCbor, &revisit).unwrap();

        let car_bytes = w.into_inner();
        let mut dec = CarDecoder::new(&car_bytes[..]).unwrap();
        let records: Vec<Record> = dec.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, records[1].payload);
        assert_eq!(dec.stats().deduplicated, 1);
    }

    #[test]
    fn dangling_payload_is_an_error() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let missing = crate::content_id::identify(Codec::Raw, b"never written");
        let header = header_block(&[("WARC-Type", "resource")], &[(PAYLOAD_CID, missing)]);
        w.put(Codec::DagCbor, &header).unwrap();

        let err = decode_all(&w.into_inner()).unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::DanglingReference { record: 0, field: PAYLOAD_CID, cid } if cid == missing
        ));
    }

    #[test]
    fn decoder_stops_after_error() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let missing = crate::content_id::identify(Codec::Raw, b"gone");
        let header = header_block(&[("WARC-Type", "resource")], &[(PAYLOAD_CID, missing)]);
        w.put(Codec::DagCbor, &header).unwrap();

        let bytes = w.into_inner();
        let mut dec = CarDecoder::new(&bytes[..]).unwrap();
        assert!(dec.next_record().is_err());
        assert!(dec.next_record().unwrap().is_none());
    }

    #[test]
    fn nested_block_without_start_line() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let nested_bytes = header_block(&[("Host", "a")], &[]);
        let nested = crate::content_id::identify(Codec::DagCbor, &nested_bytes);
        let header = header_block(&[("WARC-Type", "request")], &[(HEADERS_CID, nested)]);
        w.put(Codec::DagCbor, &header).unwrap();
        w.write_block(&nested, &nested_bytes).unwrap();

        let err = decode_all(&w.into_inner()).unwrap_err();
        assert!(matches!(err, TranscodeError::MissingStartLine { record: 0, .. }));
    }

    fn nested_head(fields: &[(&str, &str)]) -> Vec<u8> {
        let head = HttpHead {
            start_line: "HTTP/1.1 200 OK".into(),
            headers: fields.iter().copied().collect(),
        };
        encode_headers(&head.to_canonical()).unwrap()
    }

    #[test]
    fn nested_block_before_header_still_resolves() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let nested = w.put(Codec::DagCbor, &nested_head(&[("Server", "x")])).unwrap();
        let header = header_block(&[("WARC-Type", "response")], &[(HEADERS_CID, nested)]);
        w.put(Codec::DagCbor, &header).unwrap();

        let records = decode_all(&w.into_inner()).unwrap();
        assert_eq!(records.len(), 1);
        let http = records[0].http.as_ref().unwrap();
        assert_eq!(http.start_line, "HTTP/1.1 200 OK");
        assert_eq!(http.headers.get("server"), Some("x"));
    }

    #[test]
    fn nested_block_with_warc_type_field_is_not_a_record() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let nested = w
            .put(Codec::DagCbor, &nested_head(&[("WARC-Type", "proxy-echo")]))
            .unwrap();
        let header = header_block(&[("WARC-Type", "response")], &[(HEADERS_CID, nested)]);
        w.put(Codec::DagCbor, &header).unwrap();

        let car_bytes = w.into_inner();
        let mut dec = CarDecoder::new(&car_bytes[..]).unwrap();
        let records: Vec<Record> = dec.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), Some("response"));
        let http = records[0].http.as_ref().unwrap();
        assert_eq!(http.headers.get("warc-type"), Some("proxy-echo"));
        assert_eq!(dec.stats().header_blocks, 1);
    }

    #[test]
    fn link_to_header_block_resolves() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let first = header_block(&[("WARC-Type", "metadata")], &[]);
        let first_cid = w.put(Codec::DagCbor, &first).unwrap();
        let second = header_block(&[("WARC-Type", "resource")], &[(PAYLOAD_CID, first_cid)]);
        w.put(Codec::DagCbor, &second).unwrap();

        let records = decode_all(&w.into_inner()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payload, first);
    }

    #[test]
    fn undecodable_nested_block_names_the_record() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let plain = header_block(&[("WARC-Type", "warcinfo")], &[]);
        w.put(Codec::DagCbor, &plain).unwrap();
        let broken = crate::content_id::identify(Codec::DagCbor, &[0xFF]);
        let header = header_block(&[("WARC-Type", "request")], &[(HEADERS_CID, broken)]);
        w.put(Codec::DagCbor, &header).unwrap();
        w.write_block(&broken, &[0xFF]).unwrap();

        let err = decode_all(&w.into_inner()).unwrap_err();
        assert!(matches!(err, TranscodeError::Decode { record: 1, cid, .. } if cid == broken));
    }

    #[test]
    fn header_only_archive_has_no_records() {
        let bytes = BlockWriter::new(Vec::new(), &CarHeader::default())
            .unwrap()
            .into_inner();
        assert!(decode_all(&bytes).unwrap().is_empty());
    }

    #[test]
    fn records_keep_header_order() {
        let mut w = BlockWriter::new(Vec::new(), &CarHeader::default()).unwrap();
        let late = crate::content_id::identify(Codec::Raw, b"late");
        let first = header_block(&[("WARC-Type", "resource"), ("X-N", "1")], &[(PAYLOAD_CID, late)]);
        let second = header_block(&[("WARC-Type", "warcinfo"), ("X-N", "2")], &[]);
        w.put(Codec::DagCbor, &first).unwrap();
        w.put(Codec::DagCbor, &second).unwrap();
        w.write_block(&late, b"late").unwrap();

        let records = decode_all(&w.into_inner()).unwrap();
        let order: Vec<_> = records.iter().map(|r| r.headers.get("x-n").unwrap()).collect();
        assert_eq!(order, ["1", "2"]);
    }
}
