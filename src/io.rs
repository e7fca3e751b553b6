// File-level conversion between .warc and .car archives.
//
// `convert_file()` picks the direction from the two file extensions and
// wraps the streaming transcoders with buffered I/O. The SHA-256 of the
// produced file is computed while it is written.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::transcode::{self, TranscodeError, TranscodeOptions, TranscodeStats};

// ---------------------------------------------------------------------------
// Archive kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Warc,
    Car,
}

impl ArchiveKind {
    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("warc") {
            Some(Self::Warc)
        } else if ext.eq_ignore_ascii_case("car") {
            Some(Self::Car)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Warc => "warc",
            Self::Car => "car",
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `convert_file()`.
#[derive(Debug, Clone)]
pub struct ConvertStats {
    pub input_kind: ArchiveKind,
    pub output_kind: ArchiveKind,
    /// Input file size in bytes.
    pub input_size: u64,
    /// Output file size in bytes.
    pub output_size: u64,
    /// SHA-256 of the output file.
    pub output_sha256: [u8; 32],
    pub transcode: TranscodeStats,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot open {path}: {source}")]
    Input { path: String, source: io::Error },
    #[error("unrecognized archive extension: {0} (expected .warc or .car)")]
    UnknownKind(String),
    #[error("input and output are both .{0} files")]
    SameKind(&'static str),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// convert_file
// ---------------------------------------------------------------------------

/// Work out the direction for an input/output pair.
pub fn classify(input: &Path, output: &Path) -> Result<(ArchiveKind, ArchiveKind), ConvertError> {
    let kind_of = |p: &Path| {
        ArchiveKind::from_path(p).ok_or_else(|| ConvertError::UnknownKind(p.display().to_string()))
    };
    let from = kind_of(input)?;
    let to = kind_of(output)?;
    if from == to {
        return Err(ConvertError::SameKind(from.name()));
    }
    Ok((from, to))
}

/// Convert `input_path` into `output_path`, direction chosen by extension.
///
/// The output file is created (or truncated) once the input is open. If an
/// error other than `UnknownKind`, `SameKind` or `Input` is returned, the
/// output holds a partial archive and should be removed by the caller.
pub fn convert_file(
    input_path: &Path,
    output_path: &Path,
    opts: &TranscodeOptions,
) -> Result<ConvertStats, ConvertError> {
    let (input_kind, output_kind) = classify(input_path, output_path)?;

    let input_file = File::open(input_path).map_err(|source| ConvertError::Input {
        path: input_path.display().to_string(),
        source,
    })?;
    let input_size = input_file.metadata()?.len();
    let reader = BufReader::with_capacity(BUF_SIZE, input_file);

    let output_file = File::create(output_path)?;
    let mut writer = HashingWriter::new(BufWriter::with_capacity(BUF_SIZE, output_file));

    debug!(
        "converting {} ({}) -> {} ({})",
        input_path.display(),
        input_kind.name(),
        output_path.display(),
        output_kind.name()
    );
    let transcode = match input_kind {
        ArchiveKind::Warc => transcode::warc_to_car_with_options(reader, &mut writer, opts)?,
        ArchiveKind::Car => transcode::car_to_warc(reader, &mut writer)?,
    };
    writer.flush()?;

    let (output_size, output_sha256) = writer.finish();
    Ok(ConvertStats {
        input_kind,
        output_kind,
        input_size,
        output_size,
        output_sha256,
        transcode,
    })
}

/// Lowercase hex rendering of a digest.
pub fn hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Hashing writer
// ---------------------------------------------------------------------------

struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    fn finish(self) -> (u64, [u8; 32]) {
        (self.written, self.hasher.finalize().into())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
