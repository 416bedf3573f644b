// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test plugins shared by this crate's tests and the workspace specs.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prost::Message as _;
use weir_core::{Message, PackRef};

use crate::plugin::{Encoder, Filter, Input, Output, Plugin, PluginError};
use crate::runner::filter::{FilterEvent, FilterHandle};
use crate::runner::input::InputHandle;

/// Injects one pack per prepared message, then waits for stop.
pub struct StaticInput {
    pub messages: Vec<Message>,
}

impl Plugin for StaticInput {}

#[async_trait]
impl Input for StaticInput {
    async fn run(&mut self, handle: &InputHandle) -> Result<(), PluginError> {
        for message in self.messages.drain(..) {
            let pack = handle.new_pack().await;
            {
                let mut state = pack.state_mut();
                state.msg_bytes = message.encode_to_vec();
                state.message = message;
                state.trust_msg_bytes = true;
                state.decoded = true;
            }
            if handle.inject(pack).await.is_err() {
                break;
            }
        }
        handle.stop_token().cancelled().await;
        Ok(())
    }
}

/// Records every byte slice the runner hands it; optionally fails the
/// first N sends to exercise retry.
#[derive(Clone, Default)]
pub struct CollectingOutput {
    pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
    pub failures_left: Arc<Mutex<u32>>,
}

impl CollectingOutput {
    pub fn failing(times: u32) -> Self {
        let output = Self::default();
        *output.failures_left.lock() = times;
        output
    }

    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

impl Plugin for CollectingOutput {}

#[async_trait]
impl Output for CollectingOutput {
    async fn send(&mut self, encoded: &[u8]) -> Result<(), PluginError> {
        {
            let mut failures = self.failures_left.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(PluginError::recoverable("induced failure"));
            }
        }
        self.sent.lock().push(encoded.to_vec());
        Ok(())
    }
}

/// Counts matched packs and releases them.
#[derive(Clone, Default)]
pub struct CountingFilter {
    pub seen: Arc<Mutex<Vec<String>>>,
    pub ticks: Arc<Mutex<u32>>,
}

impl Plugin for CountingFilter {}

#[async_trait]
impl Filter for CountingFilter {
    async fn run(&mut self, handle: &mut FilterHandle) -> Result<(), PluginError> {
        loop {
            match handle.next().await {
                FilterEvent::Pack(pack) => {
                    let payload = pack.state().message.payload().to_string();
                    self.seen.lock().push(payload);
                    handle.release(pack);
                }
                FilterEvent::Tick => {
                    *self.ticks.lock() += 1;
                }
                FilterEvent::Shutdown => return Ok(()),
            }
        }
    }
}

/// Encoder that emits the raw msg bytes untouched.
#[derive(Default)]
pub struct RawEncoder;

impl Encoder for RawEncoder {
    fn encode(&mut self, pack: &PackRef) -> Result<Option<Vec<u8>>, PluginError> {
        Ok(Some(pack.state().msg_bytes.clone()))
    }
}
