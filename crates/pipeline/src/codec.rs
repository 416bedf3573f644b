// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in protobuf codec and the payload encoder.

use prost::Message as _;
use weir_core::{Message, PackRef};

use crate::plugin::{DecodeOutcome, Decoder, Encoder, Plugin, PluginError};

/// Decodes `msg_bytes` into the pack's message.
#[derive(Default)]
pub struct ProtobufDecoder;

impl Plugin for ProtobufDecoder {}

impl Decoder for ProtobufDecoder {
    fn decode(&mut self, pack: &PackRef) -> Result<DecodeOutcome, PluginError> {
        let mut state = pack.state_mut();
        let message = Message::decode(state.msg_bytes.as_slice())
            .map_err(|err| PluginError::recoverable(format!("protobuf decode: {err}")))?;
        state.message = message;
        state.decoded = true;
        state.trust_msg_bytes = true;
        Ok(DecodeOutcome::One)
    }
}

/// Emits the canonical protobuf encoding of the message, reusing the
/// pack's msg bytes when they are known to be current.
#[derive(Default)]
pub struct ProtobufEncoder;

impl Encoder for ProtobufEncoder {
    fn encode(&mut self, pack: &PackRef) -> Result<Option<Vec<u8>>, PluginError> {
        let state = pack.state();
        if state.trust_msg_bytes {
            return Ok(Some(state.msg_bytes.clone()));
        }
        Ok(Some(state.message.encode_to_vec()))
    }
}

/// Emits just the message payload, for line-oriented sinks.
#[derive(Default)]
pub struct PayloadEncoder {
    /// Append a newline to each emitted payload.
    pub append_newline: bool,
}

impl Encoder for PayloadEncoder {
    fn encode(&mut self, pack: &PackRef) -> Result<Option<Vec<u8>>, PluginError> {
        let state = pack.state();
        let payload = state.message.payload();
        if payload.is_empty() {
            return Ok(None);
        }
        let mut out = payload.as_bytes().to_vec();
        if self.append_newline {
            out.push(b'\n');
        }
        Ok(Some(out))
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
