// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin contracts.
//!
//! Runners own their plugins; plugins talk back only through the
//! narrow handle passed into `run`. Optional capabilities (restart
//! cleanup) are default methods on the shared `Plugin` trait, so a
//! plugin implements only what it offers.

use async_trait::async_trait;
use thiserror::Error;
use weir_core::PackRef;

use crate::runner::filter::FilterHandle;
use crate::runner::input::InputHandle;

#[derive(Debug, Error)]
pub enum PluginError {
    /// Worth retrying; the runner consults its restart policy.
    #[error("{0}")]
    Recoverable(String),
    /// Permanent stop; the runner publishes a terminated report.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl PluginError {
    pub fn recoverable(msg: impl Into<String>) -> Self {
        Self::Recoverable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Lifecycle shared by every plugin role.
pub trait Plugin: Send + Sync + 'static {
    /// Called before `run`, and again before each restart.
    fn init(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Restartable plugins are re-run after a recoverable failure.
    fn is_restartable(&self) -> bool {
        false
    }

    /// Drop per-run state before a restart.
    fn cleanup_for_restart(&mut self) {}
}

/// Reads an external source and injects packs.
#[async_trait]
pub trait Input: Plugin {
    /// Drive the source until the handle's stop token fires or the
    /// source fails.
    async fn run(&mut self, handle: &InputHandle) -> Result<(), PluginError>;
}

/// What a decoder produced from one pack.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// The pack itself now carries the decoded message.
    One,
    /// Splitting decoders: deliver these packs instead; the original
    /// is released by the runner.
    Many(Vec<PackRef>),
}

/// Turns raw msg bytes into a structured message.
pub trait Decoder: Plugin {
    fn decode(&mut self, pack: &PackRef) -> Result<DecodeOutcome, PluginError>;
}

/// Consumes matched packs, optionally injecting new ones.
#[async_trait]
pub trait Filter: Plugin {
    async fn run(&mut self, handle: &mut FilterHandle) -> Result<(), PluginError>;
}

/// Delivers encoded bytes to an external sink.
#[async_trait]
pub trait Output: Plugin {
    async fn send(&mut self, encoded: &[u8]) -> Result<(), PluginError>;
}

/// Produces the byte form of a pack for an output.
pub trait Encoder: Send + Sync + 'static {
    /// `Ok(None)` skips the pack without error.
    fn encode(&mut self, pack: &PackRef) -> Result<Option<Vec<u8>>, PluginError>;
}
