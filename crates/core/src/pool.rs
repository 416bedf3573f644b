// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pack pool with two recycle channels.
//!
//! Inputs draw from the input channel, filter injections from the
//! inject channel. The only memory-management rule in the system:
//! whoever fans a pack out retains once per destination, and every
//! consumer releases exactly once.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;

use crate::pack::{Pack, PackOrigin, PackRef};

pub struct PackPool {
    input_tx: mpsc::Sender<PackRef>,
    input_rx: AsyncMutex<mpsc::Receiver<PackRef>>,
    inject_tx: mpsc::Sender<PackRef>,
    inject_rx: AsyncMutex<mpsc::Receiver<PackRef>>,
    size: usize,
}

impl PackPool {
    /// Creates a pool with `size` packs prefilled on each recycle channel.
    pub fn new(size: usize) -> Arc<Self> {
        let (input_tx, input_rx) = mpsc::channel(size);
        let (inject_tx, inject_rx) = mpsc::channel(size);
        for _ in 0..size {
            // Channels are sized to the pool; the prefill cannot fail.
            let _ = input_tx.try_send(Arc::new(Pack::new(PackOrigin::Input)));
            let _ = inject_tx.try_send(Arc::new(Pack::new(PackOrigin::Inject)));
        }
        Arc::new(Self {
            input_tx,
            input_rx: AsyncMutex::new(input_rx),
            inject_tx,
            inject_rx: AsyncMutex::new(inject_rx),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Blocks until an input-originated pack is available.
    pub async fn acquire(&self) -> PackRef {
        let mut rx = self.input_rx.lock().await;
        match rx.recv().await {
            Some(pack) => pack,
            // The pool owns a sender for its own lifetime.
            None => unreachable!("input recycle channel closed while pool alive"),
        }
    }

    /// Blocks until a filter-injected pack is available.
    pub async fn acquire_inject(&self) -> PackRef {
        let mut rx = self.inject_rx.lock().await;
        match rx.recv().await {
            Some(pack) => pack,
            None => unreachable!("inject recycle channel closed while pool alive"),
        }
    }

    /// Non-blocking acquire, for callers that must not stall.
    pub fn try_acquire(&self) -> Option<PackRef> {
        self.input_rx.try_lock().ok().and_then(|mut rx| rx.try_recv().ok())
    }

    pub fn retain(&self, pack: &PackRef) {
        pack.incr_ref();
    }

    /// Releases one reference. On the final release the pack is reset
    /// and pushed back onto its originating recycle channel.
    pub fn release(&self, pack: PackRef) {
        if !pack.decr_ref() {
            return;
        }
        pack.reset_for_recycle();
        let tx = match pack.origin() {
            PackOrigin::Input => &self.input_tx,
            PackOrigin::Inject => &self.inject_tx,
        };
        // Sized to the pool, so a full channel means a pack was pushed
        // twice; dropping here is safer than blocking a runner.
        if tx.try_send(pack).is_err() {
            tracing::error!("recycle channel full, dropping pack");
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
