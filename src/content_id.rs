// Content identifiers: CIDv1 over a sha2-256 multihash.
//
// Identity is (codec, digest). `Cid` already provides value equality,
// hashing (usable as a map key) and the canonical base32 text form via
// `Display`, so this module only fixes the codec tags and the hash.

use cid::Cid;
use cid::multihash::Multihash;
use sha2::{Digest, Sha256};

/// Multicodec code of the sha2-256 hash function.
pub const SHA2_256: u64 = 0x12;

/// Multicodec code for DAG-CBOR (canonical binary header objects).
pub const DAG_CBOR: u64 = 0x71;

/// Multicodec code for raw, opaque bytes.
pub const RAW: u64 = 0x55;

/// Codec tag carried by every block identifier in a warcar archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Canonically encoded header mapping.
    DagCbor,
    /// Opaque payload bytes.
    Raw,
}

impl Codec {
    /// The multicodec code written into the CID.
    #[inline]
    pub fn code(self) -> u64 {
        match self {
            Codec::DagCbor => DAG_CBOR,
            Codec::Raw => RAW,
        }
    }

    /// Resolve a multicodec code. Returns `None` for codecs this crate
    /// never produces.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            DAG_CBOR => Some(Codec::DagCbor),
            RAW => Some(Codec::Raw),
            _ => None,
        }
    }

    /// The codec tag of an existing identifier.
    pub fn of(cid: &Cid) -> Option<Self> {
        Self::from_code(cid.codec())
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::DagCbor => "dag-cbor",
            Codec::Raw => "raw",
        }
    }
}

/// Compute the identifier of `bytes` under `codec`.
pub fn identify(codec: Codec, bytes: &[u8]) -> Cid {
    let digest = Sha256::digest(bytes);
    let hash = Multihash::<64>::wrap(SHA2_256, &digest)
        .expect("a 32-byte sha2-256 digest always fits a 64-byte multihash");
    Cid::new_v1(codec.code(), hash)
}

/// Recompute the digest of `bytes` and compare it with the one in `cid`.
/// `None` when `cid` uses a hash function other than sha2-256.
pub fn verify(cid: &Cid, bytes: &[u8]) -> Option<bool> {
    if cid.hash().code() != SHA2_256 {
        return None;
    }
    Some(Sha256::digest(bytes).as_slice() == cid.hash().digest())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
