// CARv1 archive header: the DAG-CBOR map `{version, roots}` carried in the
// first frame of the stream (length-prefixed, no CID).

use cid::Cid;
use minicbor::{Decoder, Encoder};

use crate::dagcbor::{self, DecodeError, EncodeError};

/// The only archive version this crate reads or writes.
pub const CAR_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarHeader {
    pub version: u64,
    pub roots: Vec<Cid>,
}

impl Default for CarHeader {
    /// Version 1 with no roots: the flat archive warcar produces.
    fn default() -> Self {
        Self {
            version: CAR_VERSION,
            roots: Vec::new(),
        }
    }
}

impl CarHeader {
    /// Encode as deterministic DAG-CBOR. `roots` (5 bytes) sorts before
    /// `version` (7 bytes).
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.map(2)?.str("roots")?.array(self.roots.len() as u64)?;
        for root in &self.roots {
            dagcbor::encode_link(&mut enc, root)?;
        }
        enc.str("version")?.u64(self.version)?;
        Ok(buf)
    }

    /// Decode a header body. Both fields are required; unknown keys are
    /// skipped.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(bytes);
        let len = dagcbor::decode_map_len(&mut dec)?;

        let mut version = None;
        let mut roots = None;
        for _ in 0..len {
            match dagcbor::decode_text(&mut dec)? {
                "version" => version = Some(dec.u64()?),
                "roots" => {
                    let n = dagcbor::decode_array_len(&mut dec)?;
                    let mut list = Vec::new();
                    for _ in 0..n {
                        list.push(dagcbor::decode_link(&mut dec)?);
                    }
                    roots = Some(list);
                }
                _ => dec.skip()?,
            }
        }
        if dec.datatype().is_ok() {
            return Err(DecodeError::TrailingBytes);
        }

        Ok(Self {
            version: version.ok_or(DecodeError::MissingField("version"))?,
            roots: roots.ok_or(DecodeError::MissingField("roots"))?,
        })
    }
}
