// Streaming WARC record reader.
//
// Record layout:
//   WARC/<version> CRLF
//   (Name: value CRLF)*
//   CRLF
//   <Content-Length bytes of block>
//   CRLF CRLF
//
// Blank lines between records (including the trailer) are skipped, so
// bare-LF line endings and missing trailers are tolerated.

use std::io::{BufRead, Read};

use log::{debug, trace};

use super::WarcError;
use super::record::{HttpHead, Record, carries_http};
use crate::headers::HeaderMap;

pub struct WarcReader<R: BufRead> {
    inner: R,
    /// Index of the next record.
    index: u64,
    /// Bytes consumed so far.
    offset: u64,
    line: Vec<u8>,
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            offset: 0,
            line: Vec::with_capacity(256),
        }
    }

    /// Records read so far.
    pub fn records_read(&self) -> u64 {
        self.index
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next record. `Ok(None)` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, WarcError> {
        // Version line, skipping inter-record blank lines.
        let start = loop {
            let at = self.offset;
            if self.read_line()? == 0 {
                return Ok(None);
            }
            if !trim_eol(&self.line).is_empty() {
                break at;
            }
        };
        let record = self.index;

        if !trim_eol(&self.line).starts_with(b"WARC/") {
            return Err(WarcError::InvalidVersion {
                record,
                offset: start,
                line: String::from_utf8_lossy(trim_eol(&self.line)).into_owned(),
            });
        }

        let headers = self.read_headers(record, start)?;

        let kind = headers
            .get("warc-type")
            .ok_or(WarcError::MissingField {
                record,
                offset: start,
                field: "WARC-Type",
            })?
            .to_string();
        let raw_len = headers.get("content-length").ok_or(WarcError::MissingField {
            record,
            offset: start,
            field: "Content-Length",
        })?;
        let len: u64 = raw_len
            .trim()
            .parse()
            .map_err(|_| WarcError::InvalidContentLength {
                record,
                offset: start,
                value: raw_len.to_string(),
            })?;

        let mut block = Vec::new();
        let got = self.inner.by_ref().take(len).read_to_end(&mut block)?;
        self.offset += got as u64;
        if (got as u64) < len {
            return Err(WarcError::Truncated {
                record,
                offset: start,
            });
        }

        let (http, payload) = if carries_http(&headers) {
            match HttpHead::parse(&block) {
                Some((head, body_start)) => {
                    let payload = block.split_off(body_start);
                    (Some(head), payload)
                }
                None => {
                    debug!("record {}: unparseable HTTP head, keeping block opaque", record);
                    (None, block)
                }
            }
        } else {
            (None, block)
        };

        debug!(
            "record {} @{}: {} ({} block bytes)",
            record, start, kind, len
        );
        self.index += 1;
        Ok(Some(Record {
            headers,
            http,
            payload,
        }))
    }

    fn read_headers(&mut self, record: u64, start: u64) -> Result<HeaderMap, WarcError> {
        let mut fields: Vec<(String, String)> = Vec::new();
        loop {
            if self.read_line()? == 0 {
                return Err(WarcError::Truncated {
                    record,
                    offset: start,
                });
            }
            let raw = trim_eol(&self.line);
            if raw.is_empty() {
                break;
            }
            let line = std::str::from_utf8(raw).map_err(|_| WarcError::NotUtf8 {
                record,
                offset: start,
            })?;

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = fields.last_mut() else {
                    return Err(WarcError::MalformedHeader {
                        record,
                        offset: start,
                        line: line.to_string(),
                    });
                };
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(WarcError::MalformedHeader {
                    record,
                    offset: start,
                    line: line.to_string(),
                });
            };
            trace!("record {}: {}: {}", record, name.trim(), value.trim());
            fields.push((name.trim().to_string(), value.trim().to_string()));
        }
        Ok(fields.into_iter().collect())
    }

    fn read_line(&mut self) -> Result<usize, WarcError> {
        self.line.clear();
        let n = self.inner.read_until(b'\n', &mut self.line)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<Record, WarcError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
