// Streaming WARC record writer.

use std::io::{self, Write};

use super::record::Record;

/// Version line written for every record.
pub const WARC_VERSION: &str = "WARC/1.1";

pub struct WarcWriter<W: Write> {
    inner: W,
    records: u64,
    bytes_written: u64,
}

impl<W: Write> WarcWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records: 0,
            bytes_written: 0,
        }
    }

    /// Write one record.
    ///
    /// Headers go out in mapping order. `Content-Length` is replaced in
    /// place by the actual block length (or appended if missing).
    pub fn write_record(&mut self, record: &Record) -> io::Result<()> {
        let block_len = record.block_len();
        let mut head = Vec::with_capacity(256);
        head.extend_from_slice(WARC_VERSION.as_bytes());
        head.extend_from_slice(b"\r\n");

        let mut wrote_length = false;
        for (name, value) in record.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") {
                if wrote_length {
                    continue;
                }
                write!(head, "{name}: {block_len}\r\n")?;
                wrote_length = true;
            } else {
                write!(head, "{name}: {value}\r\n")?;
            }
        }
        if !wrote_length {
            write!(head, "Content-Length: {block_len}\r\n")?;
        }
        head.extend_from_slice(b"\r\n");

        self.inner.write_all(&head)?;
        let mut written = head.len();
        if let Some(http) = &record.http {
            let bytes = http.serialize();
            self.inner.write_all(&bytes)?;
            written += bytes.len();
        }
        self.inner.write_all(&record.payload)?;
        self.inner.write_all(b"\r\n\r\n")?;
        written += record.payload.len() + 4;

        self.records += 1;
        self.bytes_written += written as u64;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
