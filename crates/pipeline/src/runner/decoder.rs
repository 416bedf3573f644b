// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoder runner: turns raw pack bytes into structured messages and
//! forwards them to the router.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weir_core::{Clock, PackPool, PackRef};

use crate::plugin::{DecodeOutcome, Decoder, PluginError};
use crate::sample::DurationSampler;

pub(crate) struct DecoderRunner<C: Clock> {
    name: String,
    plugin: Box<dyn Decoder>,
    inbox: mpsc::Receiver<PackRef>,
    router_tx: mpsc::Sender<PackRef>,
    /// Failed packs go here instead of back to the pool, when set.
    error_sink: Option<mpsc::Sender<PackRef>>,
    pool: Arc<PackPool>,
    sampler: DurationSampler<C>,
}

impl<C: Clock> DecoderRunner<C> {
    pub fn new(
        name: String,
        plugin: Box<dyn Decoder>,
        inbox: mpsc::Receiver<PackRef>,
        router_tx: mpsc::Sender<PackRef>,
        error_sink: Option<mpsc::Sender<PackRef>>,
        pool: Arc<PackPool>,
        clock: C,
    ) -> Self {
        let sampler = DurationSampler::new(clock, 1000);
        Self { name, plugin, inbox, router_tx, error_sink, pool, sampler }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(pack) = self.inbox.recv().await {
            let plugin = &mut self.plugin;
            let outcome = self.sampler.measure(|| plugin.decode(&pack));
            match outcome {
                Ok(DecodeOutcome::One) => self.forward(pack).await,
                Ok(DecodeOutcome::Many(packs)) => {
                    for decoded in packs {
                        self.forward(decoded).await;
                    }
                    self.pool.release(pack);
                }
                Err(err) => self.failed(pack, &err).await,
            }
        }
        tracing::debug!(decoder = %self.name, "decoder stopped");
    }

    async fn forward(&self, pack: PackRef) {
        if let Err(mpsc::error::SendError(pack)) = self.router_tx.send(pack).await {
            self.pool.release(pack);
        }
    }

    async fn failed(&self, pack: PackRef, err: &PluginError) {
        tracing::warn!(decoder = %self.name, error = %err, "decode failed");
        match &self.error_sink {
            Some(sink) => {
                if let Err(mpsc::error::SendError(pack)) = sink.send(pack).await {
                    self.pool.release(pack);
                }
            }
            None => self.pool.release(pack),
        }
    }
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
