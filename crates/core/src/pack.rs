// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable message envelope.
//!
//! A `Pack` is born in the pool and never freed; consumers share it as
//! an `Arc` while an explicit reference count decides when it returns
//! to its recycle channel. The count, not the `Arc`, is the lifetime
//! authority: pool size stays bounded regardless of how long stray
//! clones linger.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::message::Message;

/// Which recycle channel a pack returns to when its count hits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackOrigin {
    /// Acquired by an input from the input recycle channel.
    Input,
    /// Acquired by a filter injection from the inject recycle channel.
    Inject,
}

/// Mutable envelope contents. Held behind a lock so a pack can be
/// mutated while uniquely owned and read while fanned out.
#[derive(Debug, Default)]
pub struct PackState {
    pub message: Message,
    /// Canonical binary encoding of `message`.
    pub msg_bytes: Vec<u8>,
    /// Whether `msg_bytes` is known to match `message`.
    pub trust_msg_bytes: bool,
    pub decoded: bool,
    /// Incremented on every re-injection; bounded by `max_msg_loops`.
    pub msg_loop_count: u32,
    pub signer: String,
    /// Opaque `"id offset"` position in an output's disk queue.
    pub queue_cursor: String,
    /// Runner identities stamped during the last router fan-out.
    pub diagnostics: Vec<String>,
}

impl PackState {
    /// Zero every mutable field, keeping buffer capacity.
    pub(crate) fn reset(&mut self) {
        self.message = Message::default();
        self.msg_bytes.clear();
        self.trust_msg_bytes = false;
        self.decoded = false;
        self.msg_loop_count = 0;
        self.signer.clear();
        self.queue_cursor.clear();
        self.diagnostics.clear();
    }
}

pub struct Pack {
    state: RwLock<PackState>,
    ref_count: AtomicU32,
    origin: PackOrigin,
}

/// Shared handle to a pooled pack.
pub type PackRef = std::sync::Arc<Pack>;

impl Pack {
    pub(crate) fn new(origin: PackOrigin) -> Self {
        Self {
            state: RwLock::new(PackState::default()),
            ref_count: AtomicU32::new(1),
            origin,
        }
    }

    pub fn origin(&self) -> PackOrigin {
        self.origin
    }

    pub fn state(&self) -> RwLockReadGuard<'_, PackState> {
        self.state.read()
    }

    pub fn state_mut(&self) -> RwLockWriteGuard<'_, PackState> {
        self.state.write()
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    pub(crate) fn incr_ref(&self) {
        self.ref_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the count, returning true on the 1 → 0 transition.
    /// Panics when called on a pack whose count is already zero; that
    /// is a violated ownership invariant, not a recoverable state.
    pub(crate) fn decr_ref(&self) -> bool {
        let prev = self.ref_count.fetch_sub(1, Ordering::AcqRel);
        assert!(prev != 0, "pack released with zero reference count");
        prev == 1
    }

    pub(crate) fn reset_for_recycle(&self) {
        self.state.write().reset();
        self.ref_count.store(1, Ordering::Release);
    }
}

impl std::fmt::Debug for Pack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pack")
            .field("origin", &self.origin)
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "pack_tests.rs"]
mod tests;
