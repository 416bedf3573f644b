// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! weir-pipeline: the message pipeline runtime.
//!
//! Inputs acquire packs from the pool and inject them (optionally via a
//! decoder) into the router, which fans every pack out to the match
//! runner of each registered filter and output. Matched packs flow to
//! the plugin runners; outputs may spool through a disk queue when the
//! sink is slow or down.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod match_runner;
mod pipeline;
mod plugin;
mod report;
mod router;
mod runner;
mod sample;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use codec::{PayloadEncoder, ProtobufDecoder, ProtobufEncoder};
pub use match_runner::MatchStats;
pub use pipeline::{FilterOptions, OutputOptions, Pipeline};
pub use plugin::{DecodeOutcome, Decoder, Encoder, Filter, Input, Output, Plugin, PluginError};
pub use report::{
    all_report_message, ReportEntry, TYPE_ALL_REPORT, TYPE_SANDBOX_OUTPUT,
    TYPE_SANDBOX_TERMINATED, TYPE_TERMINATED,
};
pub use runner::filter::{FilterEvent, FilterHandle};
pub use runner::input::InputHandle;
pub use sample::DurationSampler;

use thiserror::Error;
use weir_matcher::MatcherError;
use weir_queue::QueueError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("plugin {0:?} already registered")]
    DuplicatePlugin(String),
    #[error("unknown plugin {0:?}")]
    UnknownPlugin(String),
    #[error("invalid matcher: {0}")]
    Matcher(#[from] MatcherError),
    #[error("message hop limit {0} exceeded")]
    HopLimit(u32),
    #[error("injection budget {0} exhausted")]
    InjectBudget(u32),
    #[error("pipeline is shutting down")]
    Shutdown,
    #[error(transparent)]
    Queue(#[from] QueueError),
}
