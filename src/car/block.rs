// Block framing over a CARv1 byte stream.
//
// Frame = varint(len(cid) + len(data)) || cid || data. The archive header
// is the first frame and has no CID. Readers recompute every block's
// digest and reject a frame whose identifier does not match its bytes.

use std::io::{self, Read, Write};

use cid::Cid;
use log::trace;

use super::CarError;
use super::header::{CAR_VERSION, CarHeader};
use super::varint;
use crate::content_id::{Codec, identify, verify};

/// One framed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl Block {
    /// Codec of the block, if it is one warcar knows.
    pub fn codec(&self) -> Option<Codec> {
        Codec::of(&self.cid)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Streaming frame writer. The archive header is written on construction.
pub struct BlockWriter<W: Write> {
    inner: W,
    blocks: u64,
    bytes_written: u64,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(mut inner: W, header: &CarHeader) -> Result<Self, CarError> {
        let body = header.encode()?;
        varint::write_usize(&mut inner, body.len())?;
        inner.write_all(&body)?;
        let bytes_written = (varint::sizeof_u64(body.len() as u64) + body.len()) as u64;
        trace!("car header: {} bytes", bytes_written);
        Ok(Self {
            inner,
            blocks: 0,
            bytes_written,
        })
    }

    /// Frame and write one block under an already computed identifier.
    pub fn write_block(&mut self, cid: &Cid, data: &[u8]) -> io::Result<()> {
        let cid_bytes = cid.to_bytes();
        let len = cid_bytes.len() + data.len();
        varint::write_usize(&mut self.inner, len)?;
        self.inner.write_all(&cid_bytes)?;
        self.inner.write_all(data)?;
        self.blocks += 1;
        self.bytes_written += (varint::sizeof_u64(len as u64) + len) as u64;
        trace!("frame {}: {} ({} bytes)", self.blocks, cid, data.len());
        Ok(())
    }

    /// Identify `data` under `codec` and write it. Returns the identifier.
    pub fn put(&mut self, codec: Codec, data: &[u8]) -> io::Result<Cid> {
        let cid = identify(codec, data);
        self.write_block(&cid, data)?;
        Ok(cid)
    }

    /// Blocks written, not counting the archive header.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Total bytes written, header included.
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

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Streaming frame reader. The archive header is read on construction.
pub struct BlockReader<R: Read> {
    inner: R,
    header: CarHeader,
    offset: u64,
}

impl<R: Read> BlockReader<R> {
    pub fn new(mut inner: R) -> Result<Self, CarError> {
        let (len, prefix) = match read_frame_len(&mut inner, 0)? {
            Some(frame) => frame,
            None => return Err(CarError::MissingHeader),
        };
        let body = read_exact_frame(&mut inner, len, 0)?;
        let header = CarHeader::decode(&body)?;
        if header.version != CAR_VERSION {
            return Err(CarError::UnsupportedVersion(header.version));
        }
        let offset = prefix as u64 + len;
        trace!("car header: version {}, {} roots", header.version, header.roots.len());
        Ok(Self {
            inner,
            header,
            offset,
        })
    }

    pub fn header(&self) -> &CarHeader {
        &self.header
    }

    /// Byte offset of the next frame.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next frame. `Ok(None)` at a clean end of stream.
    pub fn next_block(&mut self) -> Result<Option<Block>, CarError> {
        let start = self.offset;
        let (len, prefix) = match read_frame_len(&mut self.inner, start)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        let mut frame = read_exact_frame(&mut self.inner, len, start)?;

        let mut cursor: &[u8] = &frame;
        let cid = Cid::read_bytes(&mut cursor).map_err(|e| CarError::InvalidCid {
            offset: start,
            reason: e.to_string(),
        })?;
        let cid_len = frame.len() - cursor.len();
        frame.drain(..cid_len);

        match verify(&cid, &frame) {
            Some(true) => {}
            Some(false) => {
                return Err(CarError::InvalidCid {
                    offset: start,
                    reason: format!("digest mismatch for {cid}"),
                });
            }
            None => {
                return Err(CarError::InvalidCid {
                    offset: start,
                    reason: format!("unsupported hash function 0x{:x}", cid.hash().code()),
                });
            }
        }

        self.offset += prefix as u64 + len;
        trace!("frame @{}: {} ({} bytes)", start, cid, frame.len());
        Ok(Some(Block { cid, data: frame }))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for BlockReader<R> {
    type Item = Result<Block, CarError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

/// Frame length and the size of its varint prefix.
fn read_frame_len<R: Read>(r: &mut R, offset: u64) -> Result<Option<(u64, usize)>, CarError> {
    match varint::stream_read_u64(r) {
        Ok(len) => Ok(len),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CarError::Truncated { offset }),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(CarError::InvalidFrame {
            offset,
            reason: e.to_string(),
        }),
        Err(e) => Err(CarError::Io(e)),
    }
}

fn read_exact_frame<R: Read>(r: &mut R, len: u64, offset: u64) -> Result<Vec<u8>, CarError> {
    let mut buf = Vec::new();
    let got = r.by_ref().take(len).read_to_end(&mut buf)?;
    if (got as u64) < len {
        return Err(CarError::Truncated { offset });
    }
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
