// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed wire format and stream splitters.
//!
//! One record format everywhere, network and disk:
//! `0x1E | header_len | header(protobuf) | 0x1F | message bytes`

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod header;
mod pattern;
mod signer;
mod splitter;
mod token;

pub use framing::FramingSplitter;
pub use header::{
    decode_frame, write_framed, Encoding, HashFunction, Header, DEFAULT_MAX_MESSAGE_SIZE,
    HEADER_FRAMING_SIZE, MAX_HEADER_SIZE, MAX_RECORD_SIZE, RECORD_SEPARATOR, UNIT_SEPARATOR,
};
pub use pattern::RegexSplitter;
pub use signer::{SignerTable, SigningConfig, Verification};
pub use splitter::{RecordSplitter, Split, StreamSplitter};
pub use token::TokenSplitter;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    /// A record would exceed the splitter's maximum record size.
    #[error("record exceeds maximum record size")]
    ShortBuffer,
    #[error("framed header exceeds {MAX_HEADER_SIZE} bytes ({0})")]
    HeaderTooBig(usize),
    #[error("malformed frame: {0}")]
    BadFrame(&'static str),
    #[error("delimiter pattern may have at most one capture group")]
    TooManyCaptures,
    #[error("invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
