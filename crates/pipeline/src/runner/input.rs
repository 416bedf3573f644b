// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input runner: supervises a source plugin and provides its injection
//! paths into the pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weir_core::{PackPool, PackRef, RetryHelper, RetryOptions};

use crate::plugin::Input;
use crate::report;
use crate::runner::{after_failure, RestartDecision};
use crate::PipelineError;

/// Runner-facing capability handed to an input plugin.
pub struct InputHandle {
    name: String,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
    decoder_tx: Option<mpsc::Sender<PackRef>>,
    max_msg_loops: u32,
    stop: CancellationToken,
}

impl InputHandle {
    pub(crate) fn new(
        name: String,
        pool: Arc<PackPool>,
        router_tx: mpsc::Sender<PackRef>,
        decoder_tx: Option<mpsc::Sender<PackRef>>,
        max_msg_loops: u32,
        stop: CancellationToken,
    ) -> Self {
        Self { name, pool, router_tx, decoder_tx, max_msg_loops, stop }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fires when the pipeline wants this input gone. Long reads must
    /// select against it.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// A fresh pack from the input recycle channel.
    pub async fn new_pack(&self) -> PackRef {
        self.pool.acquire().await
    }

    pub fn release(&self, pack: PackRef) {
        self.pool.release(pack);
    }

    /// Injects through the configured decoder when there is one,
    /// directly to the router otherwise.
    pub async fn inject(&self, pack: PackRef) -> Result<(), PipelineError> {
        match &self.decoder_tx {
            Some(tx) => self.send_checked(tx.clone(), pack).await,
            None => self.send_checked(self.router_tx.clone(), pack).await,
        }
    }

    /// Injects straight to the router, bypassing any decoder.
    pub async fn inject_decoded(&self, pack: PackRef) -> Result<(), PipelineError> {
        self.send_checked(self.router_tx.clone(), pack).await
    }

    async fn send_checked(
        &self,
        tx: mpsc::Sender<PackRef>,
        pack: PackRef,
    ) -> Result<(), PipelineError> {
        let loops = pack.state().msg_loop_count;
        if loops > self.max_msg_loops {
            tracing::warn!(
                input = %self.name,
                loops,
                max = self.max_msg_loops,
                "pack exceeded the hop limit, dropping"
            );
            self.pool.release(pack);
            return Err(PipelineError::HopLimit(self.max_msg_loops));
        }
        match tx.send(pack).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(pack)) => {
                self.pool.release(pack);
                Err(PipelineError::Shutdown)
            }
        }
    }
}

pub(crate) struct InputRunner {
    name: String,
    plugin: Box<dyn Input>,
    retry: RetryHelper,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
}

impl InputRunner {
    pub fn new(
        name: String,
        plugin: Box<dyn Input>,
        retry: RetryOptions,
        pool: Arc<PackPool>,
        router_tx: mpsc::Sender<PackRef>,
    ) -> Self {
        Self { name, plugin, retry: RetryHelper::new(retry), pool, router_tx }
    }

    pub fn spawn(self, handle: InputHandle) -> JoinHandle<()> {
        tokio::spawn(self.run(handle))
    }

    async fn run(mut self, handle: InputHandle) {
        loop {
            if let Err(err) = self.plugin.init() {
                match after_failure(&self.name, self.plugin.is_restartable(), &err, &mut self.retry)
                    .await
                {
                    RestartDecision::Retry => continue,
                    RestartDecision::GiveUp(reason) => {
                        self.terminated(&reason).await;
                        return;
                    }
                }
            }
            match self.plugin.run(&handle).await {
                Ok(()) => {
                    tracing::info!(input = %self.name, "input finished");
                    return;
                }
                Err(err) => {
                    match after_failure(
                        &self.name,
                        self.plugin.is_restartable(),
                        &err,
                        &mut self.retry,
                    )
                    .await
                    {
                        RestartDecision::Retry => {
                            self.plugin.cleanup_for_restart();
                        }
                        RestartDecision::GiveUp(reason) => {
                            self.terminated(&reason).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn terminated(&self, reason: &str) {
        tracing::error!(input = %self.name, reason, "input terminated");
        report::publish_terminated(&self.pool, &self.router_tx, &self.name, reason).await;
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
