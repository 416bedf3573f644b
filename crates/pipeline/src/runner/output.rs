// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output runner: encodes matched packs and drives the sink, either
//! live from its inbox or spooled through the disk queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use weir_core::{Clock, FullAction, PackPool, PackRef, RetryHelper, RetryOptions};
use weir_queue::{QueueError, QueueReader, QueueWriter, ReadOutcome};
use weir_wire::write_framed;

use crate::plugin::{Encoder, Output, PluginError};
use crate::report;
use crate::runner::{after_failure, RestartDecision};
use crate::sample::DurationSampler;

/// Disk-queue halves plus the policy for a full queue.
pub(crate) struct OutputBuffer {
    pub writer: QueueWriter,
    pub reader: QueueReader,
    pub full_action: FullAction,
}

pub(crate) struct OutputRunner<C: Clock> {
    name: String,
    plugin: Box<dyn Output>,
    encoder: Box<dyn Encoder>,
    use_framing: bool,
    inbox: mpsc::Receiver<PackRef>,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
    retry: RetryHelper,
    sampler: DurationSampler<C>,
    buffer: Option<OutputBuffer>,
}

impl<C: Clock> OutputRunner<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        plugin: Box<dyn Output>,
        encoder: Box<dyn Encoder>,
        use_framing: bool,
        inbox: mpsc::Receiver<PackRef>,
        pool: Arc<PackPool>,
        router_tx: mpsc::Sender<PackRef>,
        retry: RetryOptions,
        clock: C,
        buffer: Option<OutputBuffer>,
    ) -> Self {
        let sampler = DurationSampler::new(clock, 1000);
        Self {
            name,
            plugin,
            encoder,
            use_framing,
            inbox,
            pool,
            router_tx,
            retry: RetryHelper::new(retry),
            sampler,
            buffer,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            match self.plugin.init() {
                Ok(()) => break,
                Err(err) => {
                    match after_failure(
                        &self.name,
                        self.plugin.is_restartable(),
                        &err,
                        &mut self.retry,
                    )
                    .await
                    {
                        RestartDecision::Retry => continue,
                        RestartDecision::GiveUp(reason) => {
                            self.terminated(&reason).await;
                            return;
                        }
                    }
                }
            }
        }
        let result = match self.buffer.take() {
            Some(mut buffer) => {
                let out = self.run_buffered(&mut buffer).await;
                self.buffer = Some(buffer);
                out
            }
            None => self.run_live().await,
        };
        match result {
            Ok(()) => tracing::debug!(output = %self.name, "output finished"),
            Err(reason) => self.terminated(&reason).await,
        }
    }

    /// Consume the inbox directly, delivering each pack as it arrives.
    async fn run_live(&mut self) -> Result<(), String> {
        while let Some(pack) = self.inbox.recv().await {
            let Some(encoded) = self.encode(&pack) else {
                self.pool.release(pack);
                continue;
            };
            let bytes = self.finalize(encoded).map_err(|err| err.to_string());
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(reason) => {
                    self.pool.release(pack);
                    return Err(reason);
                }
            };
            let delivery = self.deliver(&bytes).await;
            self.pool.release(pack);
            delivery?;
        }
        Ok(())
    }

    /// Spool the inbox into the disk queue and deliver from its reader,
    /// decoupling sink availability from the live stream.
    async fn run_buffered(&mut self, buffer: &mut OutputBuffer) -> Result<(), String> {
        let mut inbox_open = true;
        loop {
            // Drain whatever the router has ready before delivering.
            while inbox_open {
                match self.inbox.try_recv() {
                    Ok(pack) => self.spool(buffer, pack).await?,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => inbox_open = false,
                }
            }
            match buffer.reader.next_record() {
                Ok(ReadOutcome::Record { msg_bytes, cursor }) => {
                    let bytes = if self.use_framing {
                        let mut framed = Vec::new();
                        write_framed(&mut framed, &msg_bytes, None)
                            .map_err(|err| err.to_string())?;
                        framed
                    } else {
                        msg_bytes
                    };
                    self.deliver(&bytes).await?;
                    buffer.reader.advance_cursor(&cursor).map_err(|err| err.to_string())?;
                }
                Ok(ReadOutcome::Pending) => {
                    if !inbox_open {
                        return Ok(());
                    }
                    match self.inbox.recv().await {
                        Some(pack) => self.spool(buffer, pack).await?,
                        None => inbox_open = false,
                    }
                }
                Err(err) => return Err(format!("queue read: {err}")),
            }
        }
    }

    async fn spool(&mut self, buffer: &mut OutputBuffer, pack: PackRef) -> Result<(), String> {
        let Some(encoded) = self.encode(&pack) else {
            self.pool.release(pack);
            return Ok(());
        };
        loop {
            match buffer.writer.append(&encoded) {
                Ok(()) => break,
                Err(QueueError::Full) => match buffer.full_action {
                    FullAction::Drop => {
                        tracing::warn!(output = %self.name, "queue full, dropping message");
                        break;
                    }
                    FullAction::Shutdown => {
                        self.pool.release(pack);
                        return Err("queue full".to_string());
                    }
                    FullAction::Block => match buffer.reader.next_record() {
                        Ok(ReadOutcome::Record { msg_bytes, cursor }) => {
                            let bytes = if self.use_framing {
                                let mut framed = Vec::new();
                                write_framed(&mut framed, &msg_bytes, None)
                                    .map_err(|err| err.to_string())?;
                                framed
                            } else {
                                msg_bytes
                            };
                            if let Err(reason) = self.deliver(&bytes).await {
                                self.pool.release(pack);
                                return Err(reason);
                            }
                            buffer
                                .reader
                                .advance_cursor(&cursor)
                                .map_err(|err| err.to_string())?;
                        }
                        Ok(ReadOutcome::Pending) => {
                            self.pool.release(pack);
                            return Err("queue full with nothing left to deliver".to_string());
                        }
                        Err(err) => {
                            self.pool.release(pack);
                            return Err(format!("queue read: {err}"));
                        }
                    },
                },
                Err(err) => {
                    self.pool.release(pack);
                    return Err(format!("queue write: {err}"));
                }
            }
        }
        self.pool.release(pack);
        Ok(())
    }

    /// Encode failures skip the pack, mirroring the decode-error
    /// policy; they never take the output down.
    fn encode(&mut self, pack: &PackRef) -> Option<Vec<u8>> {
        let encoder = &mut self.encoder;
        match self.sampler.measure(|| encoder.encode(pack)) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(output = %self.name, error = %err, "encode failed, skipping pack");
                None
            }
        }
    }

    fn finalize(&self, msg_bytes: Vec<u8>) -> Result<Vec<u8>, PluginError> {
        if !self.use_framing {
            return Ok(msg_bytes);
        }
        let mut framed = Vec::new();
        write_framed(&mut framed, &msg_bytes, None)
            .map_err(|err| PluginError::fatal(format!("framing: {err}")))?;
        Ok(framed)
    }

    /// At-least-once delivery: resend at retry cadence until the sink
    /// accepts or the policy gives up.
    async fn deliver(&mut self, bytes: &[u8]) -> Result<(), String> {
        loop {
            match self.plugin.send(bytes).await {
                Ok(()) => {
                    self.retry.reset();
                    return Ok(());
                }
                Err(err) if err.is_fatal() => return Err(err.to_string()),
                Err(err) => {
                    tracing::warn!(output = %self.name, error = %err, "send failed, will retry");
                    if let Err(exhausted) = self.retry.wait().await {
                        return Err(format!("{err} ({exhausted})"));
                    }
                }
            }
        }
    }

    async fn terminated(&self, reason: &str) {
        tracing::error!(output = %self.name, reason, "output terminated");
        report::publish_terminated(&self.pool, &self.router_tx, &self.name, reason).await;
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
