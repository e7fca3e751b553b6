// Unsigned variable-length integers (multiformats `unsigned-varint`).
//
// Base-128, little-endian: least-significant group first.
// Each byte has bit 7 set except the final byte.
// Used for CAR frame lengths; CIDs carry their own varints internally.

use std::io::{self, Read, Write};

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `u64` into `buf`, least-significant group first.
/// Returns the number of bytes written (1..=10), filled from the front.
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let byte = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | 0x80;
        i += 1;
    }
}

/// Encode a `u64` and write to a `Write` sink.
pub fn write_u64<W: Write>(w: &mut W, num: u64) -> io::Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    w.write_all(&buf[..len])
}

/// Encode a `usize` and write to a `Write` sink.
pub fn write_usize<W: Write>(w: &mut W, num: usize) -> io::Result<()> {
    write_u64(w, num as u64)
}

// ---------------------------------------------------------------------------
// Decoding from byte slices
// ---------------------------------------------------------------------------

/// Decode a `u64` from the front of a byte slice.
/// Returns `(value, bytes_consumed)` or an error.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut val: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        val = accumulate(val, i, byte)?;
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }
    Err(VarIntError::Underflow)
}

/// Fold one more 7-bit group into `val`, rejecting bits past 64.
#[inline]
fn accumulate(val: u64, index: usize, byte: u8) -> Result<u64, VarIntError> {
    if index >= MAX_VARINT_LEN {
        return Err(VarIntError::Overflow);
    }
    let group = u64::from(byte & 0x7F);
    let shift = 7 * index as u32;
    // The tenth byte may only contribute the single remaining bit.
    if index == MAX_VARINT_LEN - 1 && group > 1 {
        return Err(VarIntError::Overflow);
    }
    Ok(val | (group << shift))
}

// ---------------------------------------------------------------------------
// Decoding from `Read` (streaming)
// ---------------------------------------------------------------------------

/// Read a `u64` varint from a streaming source.
///
/// Returns the value and the number of bytes consumed, which may exceed
/// [`sizeof_u64`] for a non-minimal encoding. `Ok(None)` when the source is
/// already at EOF before the first byte, which is how a CAR stream signals
/// a clean end. EOF in the middle of a varint is an `UnexpectedEof` error.
pub fn stream_read_u64<R: Read>(r: &mut R) -> io::Result<Option<(u64, usize)>> {
    let mut val: u64 = 0;
    let mut buf = [0u8; 1];
    for i in 0..MAX_VARINT_LEN {
        if r.read(&mut buf)? == 0 {
            if i == 0 {
                return Ok(None);
            }
            return Err(VarIntError::Underflow.into());
        }
        let byte = buf[0];
        val = accumulate(val, i, byte)?;
        if byte & 0x80 == 0 {
            return Ok(Some((val, i + 1)));
        }
    }
    Err(VarIntError::Overflow.into())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn sizeof_u64(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    /// Not enough input bytes to complete the integer.
    Underflow,
    /// Value would overflow 64 bits.
    Overflow,
}

impl std::fmt::Display for VarIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarIntError::Underflow => write!(f, "varint underflow (truncated input)"),
            VarIntError::Overflow => write!(f, "varint overflow"),
        }
    }
}

impl std::error::Error for VarIntError {}

impl From<VarIntError> for io::Error {
    fn from(e: VarIntError) -> io::Error {
        let kind = match e {
            VarIntError::Underflow => io::ErrorKind::UnexpectedEof,
            VarIntError::Overflow => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
