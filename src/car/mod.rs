// CARv1 block archive framing.
//
// A CAR stream is one length-prefixed header frame holding the DAG-CBOR
// map `{version: 1, roots: [...]}`, followed by zero or more block frames
// `varint(len) || cid || data`.

pub mod block;
pub mod header;
pub mod varint;

use std::io;

use thiserror::Error;

use crate::dagcbor::{DecodeError, EncodeError};

pub use block::{Block, BlockReader, BlockWriter};
pub use header::{CAR_VERSION, CarHeader};

#[derive(Debug, Error)]
pub enum CarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("missing archive header")]
    MissingHeader,
    #[error("invalid archive header: {0}")]
    InvalidHeader(#[from] DecodeError),
    #[error("cannot encode archive header: {0}")]
    HeaderEncode(#[from] EncodeError),
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u64),
    #[error("truncated frame at offset {offset}")]
    Truncated { offset: u64 },
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame { offset: u64, reason: String },
    #[error("invalid block identifier at offset {offset}: {reason}")]
    InvalidCid { offset: u64, reason: String },
}
