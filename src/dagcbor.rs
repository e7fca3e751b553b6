// Deterministic DAG-CBOR encoding of header mappings.
//
// Only the subset warcar produces is supported: a single definite-length
// map whose keys are text strings and whose values are text strings,
// integers or CID links (tag 42). Keys are written in DAG-CBOR order
// (shorter first, then bytewise) and minicbor always emits the shortest
// integer/length form, so equal mappings give byte-identical output.

use std::cmp::Ordering;
use std::convert::Infallible;

use cid::Cid;
use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};
use thiserror::Error;

use crate::headers::{CanonicalHeaders, HeaderValue};

/// CBOR tag for IPLD links.
pub const CID_TAG: u64 = 42;

/// Multibase identity prefix in front of a binary CID inside tag 42.
const CID_PREFIX: u8 = 0x00;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cbor encode: {0}")]
    Cbor(#[from] minicbor::encode::Error<Infallible>),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cbor decode: {0}")]
    Cbor(#[from] minicbor::decode::Error),
    #[error("indefinite-length CBOR not allowed")]
    IndefiniteLength,
    #[error("expected {expected}, got {found}")]
    UnexpectedType { expected: &'static str, found: String },
    #[error("unsupported value for field {field}: {found}")]
    UnsupportedValue { field: String, found: String },
    #[error("unsupported tag {0}")]
    UnsupportedTag(u64),
    #[error("invalid link: {0}")]
    InvalidLink(String),
    #[error("integer out of range for field {0}")]
    IntegerRange(String),
    #[error("duplicate map key: {0}")]
    DuplicateKey(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("trailing bytes after object")]
    TrailingBytes,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// DAG-CBOR map key order: length first, then bytewise.
pub fn key_order(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

/// Encode a canonical header mapping.
pub fn encode_headers(headers: &CanonicalHeaders) -> Result<Vec<u8>, EncodeError> {
    let mut entries: Vec<(&str, &HeaderValue)> = headers.iter().collect();
    entries.sort_by(|(a, _), (b, _)| key_order(a, b));

    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.map(entries.len() as u64)?;
    for (key, value) in entries {
        enc.str(key)?;
        encode_value(&mut enc, value)?;
    }
    Ok(buf)
}

fn encode_value(
    enc: &mut Encoder<&mut Vec<u8>>,
    value: &HeaderValue,
) -> Result<(), EncodeError> {
    match value {
        HeaderValue::Text(s) => {
            enc.str(s)?;
        }
        HeaderValue::Integer(n) => {
            enc.i64(*n)?;
        }
        HeaderValue::Link(cid) => encode_link(enc, cid)?,
    }
    Ok(())
}

/// Write `cid` as a tag-42 link.
pub(crate) fn encode_link(enc: &mut Encoder<&mut Vec<u8>>, cid: &Cid) -> Result<(), EncodeError> {
    let mut bytes = Vec::with_capacity(40);
    bytes.push(CID_PREFIX);
    bytes.extend_from_slice(&cid.to_bytes());
    enc.tag(Tag::new(CID_TAG))?.bytes(&bytes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a header mapping previously produced by [`encode_headers`]
/// (or any DAG-CBOR map in the same subset).
pub fn decode_headers(bytes: &[u8]) -> Result<CanonicalHeaders, DecodeError> {
    let mut dec = Decoder::new(bytes);
    let len = decode_map_len(&mut dec)?;

    let mut headers = CanonicalHeaders::new();
    for _ in 0..len {
        let key = decode_text(&mut dec)?;
        let value = decode_value(&mut dec, key)?;
        if headers.insert(key, value).is_some() {
            return Err(DecodeError::DuplicateKey(key.to_string()));
        }
    }
    if dec.datatype().is_ok() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(headers)
}

fn decode_value(dec: &mut Decoder, field: &str) -> Result<HeaderValue, DecodeError> {
    match dec.datatype()? {
        Type::String => Ok(HeaderValue::Text(dec.str()?.to_string())),
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => {
            let n = dec.u64()?;
            let n = i64::try_from(n).map_err(|_| DecodeError::IntegerRange(field.to_string()))?;
            Ok(HeaderValue::Integer(n))
        }
        Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::Int => {
            let n = dec
                .i64()
                .map_err(|_| DecodeError::IntegerRange(field.to_string()))?;
            Ok(HeaderValue::Integer(n))
        }
        Type::Tag => Ok(HeaderValue::Link(decode_link(dec)?)),
        Type::StringIndef | Type::BytesIndef | Type::ArrayIndef | Type::MapIndef => {
            Err(DecodeError::IndefiniteLength)
        }
        other => Err(DecodeError::UnsupportedValue {
            field: field.to_string(),
            found: format!("{other:?}"),
        }),
    }
}

/// Read a tag-42 link.
pub(crate) fn decode_link(dec: &mut Decoder) -> Result<Cid, DecodeError> {
    let tag = dec.tag()?;
    if tag.as_u64() != CID_TAG {
        return Err(DecodeError::UnsupportedTag(tag.as_u64()));
    }
    if matches!(dec.datatype()?, Type::BytesIndef) {
        return Err(DecodeError::IndefiniteLength);
    }
    let bytes = dec.bytes()?;
    match bytes.split_first() {
        Some((&CID_PREFIX, rest)) => {
            Cid::try_from(rest).map_err(|e| DecodeError::InvalidLink(e.to_string()))
        }
        _ => Err(DecodeError::InvalidLink(
            "missing 0x00 multibase prefix".to_string(),
        )),
    }
}

pub(crate) fn decode_map_len(dec: &mut Decoder) -> Result<u64, DecodeError> {
    match dec.datatype()? {
        Type::Map => dec.map()?.ok_or(DecodeError::IndefiniteLength),
        Type::MapIndef => Err(DecodeError::IndefiniteLength),
        other => Err(DecodeError::UnexpectedType {
            expected: "map",
            found: format!("{other:?}"),
        }),
    }
}

pub(crate) fn decode_array_len(dec: &mut Decoder) -> Result<u64, DecodeError> {
    match dec.datatype()? {
        Type::Array => dec.array()?.ok_or(DecodeError::IndefiniteLength),
        Type::ArrayIndef => Err(DecodeError::IndefiniteLength),
        other => Err(DecodeError::UnexpectedType {
            expected: "array",
            found: format!("{other:?}"),
        }),
    }
}

pub(crate) fn decode_text<'b>(dec: &mut Decoder<'b>) -> Result<&'b str, DecodeError> {
    match dec.datatype()? {
        Type::String => Ok(dec.str()?),
        Type::StringIndef => Err(DecodeError::IndefiniteLength),
        other => Err(DecodeError::UnexpectedType {
            expected: "text string",
            found: format!("{other:?}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
