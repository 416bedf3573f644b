// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record framing: the protobuf header and its byte-level envelope.

use prost::Message as _;

use crate::signer::SigningConfig;
use crate::WireError;

/// First byte of every framed record.
pub const RECORD_SEPARATOR: u8 = 0x1e;
/// Terminates the header, immediately before the message bytes.
pub const UNIT_SEPARATOR: u8 = 0x1f;
/// The header length is a single byte.
pub const MAX_HEADER_SIZE: usize = 255;
/// Separator + length byte + unit separator.
pub const HEADER_FRAMING_SIZE: usize = 3;
/// Default cap on a whole record held in a splitter buffer.
pub const MAX_RECORD_SIZE: usize = 256 * 1024;
/// Default cap on the message bytes inside a frame.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(uint32, tag = "1")]
    pub message_length: u32,
    #[prost(enumeration = "Encoding", optional, tag = "2", default = "ProtocolBuffer")]
    pub message_encoding: Option<i32>,
    #[prost(enumeration = "HashFunction", optional, tag = "3", default = "Md5")]
    pub hmac_hash_function: Option<i32>,
    #[prost(string, optional, tag = "4")]
    pub hmac_signer: Option<String>,
    #[prost(uint32, optional, tag = "5", default = "0")]
    pub hmac_key_version: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub hmac: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum Encoding {
    ProtocolBuffer = 0,
    Json = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum HashFunction {
    Md5 = 0,
    Sha1 = 1,
}

/// Appends one framed record to `out`. With a signing config the
/// header carries an HMAC computed over `msg_bytes`.
pub fn write_framed(
    out: &mut Vec<u8>,
    msg_bytes: &[u8],
    signing: Option<&SigningConfig>,
) -> Result<(), WireError> {
    let mut header = Header {
        message_length: msg_bytes.len() as u32,
        ..Default::default()
    };
    if let Some(signing) = signing {
        header.hmac_hash_function = Some(signing.hash as i32);
        header.hmac_signer = Some(signing.name.clone());
        header.hmac_key_version = Some(signing.key_version);
        header.hmac = Some(signing.sign(msg_bytes));
    }
    let header_bytes = header.encode_to_vec();
    if header_bytes.len() > MAX_HEADER_SIZE {
        return Err(WireError::HeaderTooBig(header_bytes.len()));
    }
    out.reserve(HEADER_FRAMING_SIZE + header_bytes.len() + msg_bytes.len());
    out.push(RECORD_SEPARATOR);
    out.push(header_bytes.len() as u8);
    out.extend_from_slice(&header_bytes);
    out.push(UNIT_SEPARATOR);
    out.extend_from_slice(msg_bytes);
    Ok(())
}

/// Parses one complete framed record into its header and message bytes.
///
/// Fails unless the byte before the message is the unit separator and
/// the frame length matches the header's declared message length.
pub fn decode_frame(record: &[u8]) -> Result<(Header, &[u8]), WireError> {
    if record.len() < HEADER_FRAMING_SIZE {
        return Err(WireError::BadFrame("record too short"));
    }
    if record[0] != RECORD_SEPARATOR {
        return Err(WireError::BadFrame("missing record separator"));
    }
    let header_len = record[1] as usize;
    let unit_at = 2 + header_len;
    if record.len() <= unit_at {
        return Err(WireError::BadFrame("truncated header"));
    }
    if record[unit_at] != UNIT_SEPARATOR {
        return Err(WireError::BadFrame("missing unit separator"));
    }
    let header = Header::decode(&record[2..unit_at])
        .map_err(|_| WireError::BadFrame("undecodable header"))?;
    let body = &record[unit_at + 1..];
    if body.len() != header.message_length as usize {
        return Err(WireError::BadFrame("length mismatch"));
    }
    Ok((header, body))
}

#[cfg(test)]
#[path = "header_tests.rs"]
mod tests;
