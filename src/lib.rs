//! warcar: WARC ⇄ CAR transcoding with content addressing.
//!
//! Each WARC record becomes a DAG-CBOR header block in a CARv1 archive,
//! linked by CID to a block holding its HTTP head and a raw block holding
//! its payload. Identical heads and payloads are stored once. The reverse
//! direction rebuilds the record stream from the blocks in one pass.
//!
//! The crate provides:
//! - Header canonicalization and content identifiers (`headers`, `content_id`)
//! - Deterministic DAG-CBOR encoding (`dagcbor`)
//! - CARv1 block framing (`car`) and WARC record streams (`warc`)
//! - The two transcoders (`transcode`) and file-level helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use warcar::transcode::{car_to_warc, warc_to_car};
//!
//! let warc = std::fs::read("crawl.warc").unwrap();
//! let mut car = Vec::new();
//! warc_to_car(&warc[..], &mut car).unwrap();
//!
//! let mut back = Vec::new();
//! car_to_warc(&car[..], &mut back).unwrap();
//! ```

pub mod car;
pub mod content_id;
pub mod dagcbor;
pub mod dedup;
pub mod headers;
pub mod io;
pub mod transcode;
pub mod warc;

#[cfg(feature = "cli")]
pub mod cli;
