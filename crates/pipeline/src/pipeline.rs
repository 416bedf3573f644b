// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline root value: pool, router, and the plugin registry.
//!
//! Everything process-wide hangs off one `Pipeline` handed to the
//! embedding daemon; there are no module-level globals.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weir_core::{Clock, GlobalConfig, PackPool, PackRef, RetryOptions, SystemClock};
use weir_matcher::MatcherSpecification;

use crate::match_runner::{MatchRunner, MatchStats};
use crate::plugin::{Decoder, Encoder, Filter, Input, Output};
use crate::report::{all_report_message, ReportEntry};
use crate::router::{MatcherEntry, Router, RouterCmd};
use crate::runner::decoder::DecoderRunner;
use crate::runner::filter::{FilterHandle, FilterRunner};
use crate::runner::input::{InputHandle, InputRunner};
use crate::runner::output::{OutputBuffer, OutputRunner};
use crate::PipelineError;

/// Registration options for a filter.
#[derive(Clone)]
pub struct FilterOptions {
    pub matcher: String,
    pub signer: String,
    /// Tick period in milliseconds, when the filter wants a ticker.
    pub ticker_ms: Option<u64>,
    pub retry: RetryOptions,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            matcher: "TRUE".to_string(),
            signer: String::new(),
            ticker_ms: None,
            retry: RetryOptions::default(),
        }
    }
}

/// Registration options for an output.
#[derive(Clone)]
pub struct OutputOptions {
    pub matcher: String,
    pub signer: String,
    /// Wrap encoded messages in the wire framing before sending.
    pub use_framing: bool,
    /// Spool through a disk queue under `buffer.queue_dir/<name>`.
    pub buffer: Option<weir_core::BufferConfig>,
    pub retry: RetryOptions,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            matcher: "TRUE".to_string(),
            signer: String::new(),
            use_framing: false,
            buffer: None,
            retry: RetryOptions::default(),
        }
    }
}

struct InputEntry {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

struct DecoderEntry {
    tx: mpsc::Sender<PackRef>,
    task: JoinHandle<()>,
}

struct MatchedEntry {
    match_task: JoinHandle<()>,
    plugin_task: JoinHandle<()>,
    stats: Arc<MatchStats>,
}

#[derive(Default)]
struct Registry {
    inputs: HashMap<String, InputEntry>,
    decoders: HashMap<String, DecoderEntry>,
    filters: HashMap<String, MatchedEntry>,
    outputs: HashMap<String, MatchedEntry>,
}

pub struct Pipeline<C: Clock = SystemClock> {
    config: GlobalConfig,
    clock: C,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
    control_tx: mpsc::Sender<RouterCmd>,
    router_task: JoinHandle<()>,
    registry: RwLock<Registry>,
}

impl Pipeline<SystemClock> {
    pub fn new(config: GlobalConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Pipeline<C> {
    /// Builds the pool and starts the router task. Must run inside a
    /// tokio runtime.
    pub fn with_clock(config: GlobalConfig, clock: C) -> Self {
        let pool = PackPool::new(config.pool_size);
        let (router_tx, router_rx) = mpsc::channel(config.plugin_chan_size);
        let (control_tx, control_rx) = mpsc::channel(8);
        let router_task = Router::new(Arc::clone(&pool), router_rx, control_rx).spawn();
        Self { config, clock, pool, router_tx, control_tx, router_task, registry: RwLock::default() }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<PackPool> {
        &self.pool
    }

    /// Sends a pack into the router. Used by inputs (through their
    /// handles) and by anything synthesizing packs directly.
    pub async fn inject(&self, pack: PackRef) -> Result<(), PipelineError> {
        match self.router_tx.send(pack).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(pack)) => {
                self.pool.release(pack);
                Err(PipelineError::Shutdown)
            }
        }
    }

    pub fn add_input(
        &self,
        name: &str,
        plugin: Box<dyn Input>,
        decoder: Option<&str>,
        retry: RetryOptions,
    ) -> Result<(), PipelineError> {
        let mut registry = self.registry.write();
        if registry.inputs.contains_key(name) {
            return Err(PipelineError::DuplicatePlugin(name.to_string()));
        }
        let decoder_tx = match decoder {
            Some(decoder) => Some(
                registry
                    .decoders
                    .get(decoder)
                    .ok_or_else(|| PipelineError::UnknownPlugin(decoder.to_string()))?
                    .tx
                    .clone(),
            ),
            None => None,
        };
        let stop = CancellationToken::new();
        let handle = InputHandle::new(
            name.to_string(),
            Arc::clone(&self.pool),
            self.router_tx.clone(),
            decoder_tx,
            self.config.max_msg_loops,
            stop.clone(),
        );
        let runner = InputRunner::new(
            name.to_string(),
            plugin,
            retry,
            Arc::clone(&self.pool),
            self.router_tx.clone(),
        );
        let task = runner.spawn(handle);
        registry.inputs.insert(name.to_string(), InputEntry { stop, task });
        Ok(())
    }

    /// Registers a decoder; inputs reference it by name. `error_sink`
    /// names another decoder that receives undecodable packs.
    pub fn add_decoder(
        &self,
        name: &str,
        plugin: Box<dyn Decoder>,
        error_sink: Option<&str>,
    ) -> Result<(), PipelineError> {
        let mut registry = self.registry.write();
        if registry.decoders.contains_key(name) {
            return Err(PipelineError::DuplicatePlugin(name.to_string()));
        }
        let sink_tx = match error_sink {
            Some(sink) => Some(
                registry
                    .decoders
                    .get(sink)
                    .ok_or_else(|| PipelineError::UnknownPlugin(sink.to_string()))?
                    .tx
                    .clone(),
            ),
            None => None,
        };
        let (tx, rx) = mpsc::channel(self.config.plugin_chan_size);
        let runner = DecoderRunner::new(
            name.to_string(),
            plugin,
            rx,
            self.router_tx.clone(),
            sink_tx,
            Arc::clone(&self.pool),
            self.clock.clone(),
        );
        let task = runner.spawn();
        registry.decoders.insert(name.to_string(), DecoderEntry { tx, task });
        Ok(())
    }

    pub async fn add_filter(
        &self,
        name: &str,
        plugin: Box<dyn Filter>,
        options: FilterOptions,
    ) -> Result<(), PipelineError> {
        let matcher = MatcherSpecification::new(&options.matcher)?;
        let stats = Arc::new(MatchStats::default());
        let (match_tx, match_rx) = mpsc::channel(self.config.plugin_chan_size);
        let (forward_tx, forward_rx) = mpsc::channel(self.config.plugin_chan_size);

        {
            let mut registry = self.registry.write();
            if registry.filters.contains_key(name) {
                return Err(PipelineError::DuplicatePlugin(name.to_string()));
            }
            let match_task = MatchRunner::new(
                name.to_string(),
                matcher,
                options.signer,
                Arc::clone(&self.pool),
                match_rx,
                forward_tx,
                self.clock.clone(),
                Arc::clone(&stats),
            )
            .spawn();
            let handle = FilterHandle::new(
                name.to_string(),
                Arc::clone(&self.pool),
                self.router_tx.clone(),
                forward_rx,
                options.ticker_ms.map(std::time::Duration::from_millis),
                self.config.max_msg_loops,
                self.config.max_msg_process_inject,
                self.config.max_msg_timer_inject,
            );
            let plugin_task = FilterRunner::new(
                name.to_string(),
                plugin,
                options.retry,
                Arc::clone(&self.pool),
                self.router_tx.clone(),
            )
            .spawn(handle);
            registry
                .filters
                .insert(name.to_string(), MatchedEntry { match_task, plugin_task, stats });
        }

        self.send_cmd(RouterCmd::AddFilter(MatcherEntry {
            name: name.to_string(),
            tx: match_tx,
        }))
        .await
    }

    pub async fn add_output(
        &self,
        name: &str,
        plugin: Box<dyn Output>,
        encoder: Box<dyn Encoder>,
        options: OutputOptions,
    ) -> Result<(), PipelineError> {
        let matcher = MatcherSpecification::new(&options.matcher)?;
        let buffer = match &options.buffer {
            Some(config) => {
                let dir = config.queue_dir.join(name);
                let (writer, reader) = weir_queue::open(&dir, config)?;
                Some(OutputBuffer { writer, reader, full_action: config.full_action })
            }
            None => None,
        };
        let stats = Arc::new(MatchStats::default());
        let (match_tx, match_rx) = mpsc::channel(self.config.plugin_chan_size);
        let (forward_tx, forward_rx) = mpsc::channel(self.config.plugin_chan_size);

        {
            let mut registry = self.registry.write();
            if registry.outputs.contains_key(name) {
                return Err(PipelineError::DuplicatePlugin(name.to_string()));
            }
            let match_task = MatchRunner::new(
                name.to_string(),
                matcher,
                options.signer,
                Arc::clone(&self.pool),
                match_rx,
                forward_tx,
                self.clock.clone(),
                Arc::clone(&stats),
            )
            .spawn();
            let plugin_task = OutputRunner::new(
                name.to_string(),
                plugin,
                encoder,
                options.use_framing,
                forward_rx,
                Arc::clone(&self.pool),
                self.router_tx.clone(),
                options.retry,
                self.clock.clone(),
                buffer,
            )
            .spawn();
            registry
                .outputs
                .insert(name.to_string(), MatchedEntry { match_task, plugin_task, stats });
        }

        self.send_cmd(RouterCmd::AddOutput(MatcherEntry {
            name: name.to_string(),
            tx: match_tx,
        }))
        .await
    }

    pub async fn remove_filter(&self, name: &str) -> Result<(), PipelineError> {
        let entry = self
            .registry
            .write()
            .filters
            .remove(name)
            .ok_or_else(|| PipelineError::UnknownPlugin(name.to_string()))?;
        self.send_cmd(RouterCmd::RemoveFilter(name.to_string())).await?;
        let _ = entry.match_task.await;
        let _ = entry.plugin_task.await;
        Ok(())
    }

    pub async fn remove_output(&self, name: &str) -> Result<(), PipelineError> {
        let entry = self
            .registry
            .write()
            .outputs
            .remove(name)
            .ok_or_else(|| PipelineError::UnknownPlugin(name.to_string()))?;
        self.send_cmd(RouterCmd::RemoveOutput(name.to_string())).await?;
        let _ = entry.match_task.await;
        let _ = entry.plugin_task.await;
        Ok(())
    }

    /// Snapshot of every matched plugin's evaluation counters.
    pub fn report_entries(&self) -> Vec<ReportEntry> {
        use std::sync::atomic::Ordering;
        let registry = self.registry.read();
        let mut entries: Vec<ReportEntry> = registry
            .filters
            .iter()
            .chain(registry.outputs.iter())
            .map(|(name, entry)| ReportEntry {
                name: name.clone(),
                matched: entry.stats.matched.load(Ordering::Relaxed),
                dropped: entry.stats.dropped.load(Ordering::Relaxed),
                sample_ns: entry.stats.duration_ns.load(Ordering::Relaxed),
                samples: entry.stats.samples.load(Ordering::Relaxed),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Builds and routes a `weir.all-report` pack.
    pub async fn publish_all_report(&self) -> Result<(), PipelineError> {
        let message = all_report_message(&self.report_entries(), self.clock.epoch_ns());
        let pack = self.pool.acquire_inject().await;
        pack.state_mut().message = message;
        self.inject(pack).await
    }

    /// Orderly shutdown: inputs first, then decoders and filters
    /// drain, then outputs, then the router exits once every matcher
    /// inbox is closed.
    pub async fn shutdown(self) {
        let (inputs, decoders, filters, outputs) = {
            let mut registry = self.registry.write();
            (
                std::mem::take(&mut registry.inputs),
                std::mem::take(&mut registry.decoders),
                std::mem::take(&mut registry.filters),
                std::mem::take(&mut registry.outputs),
            )
        };

        for entry in inputs.values() {
            entry.stop.cancel();
        }
        for (name, entry) in inputs {
            if entry.task.await.is_err() {
                tracing::warn!(input = %name, "input task panicked during shutdown");
            }
        }

        for (name, entry) in decoders {
            drop(entry.tx);
            if entry.task.await.is_err() {
                tracing::warn!(decoder = %name, "decoder task panicked during shutdown");
            }
        }

        for (name, entry) in filters {
            let _ = self.send_cmd(RouterCmd::RemoveFilter(name.clone())).await;
            let _ = entry.match_task.await;
            let _ = entry.plugin_task.await;
        }
        for (name, entry) in outputs {
            let _ = self.send_cmd(RouterCmd::RemoveOutput(name.clone())).await;
            let _ = entry.match_task.await;
            let _ = entry.plugin_task.await;
        }

        let Self { router_tx, control_tx, router_task, .. } = self;
        drop(router_tx);
        drop(control_tx);
        let _ = router_task.await;
    }

    async fn send_cmd(&self, cmd: RouterCmd) -> Result<(), PipelineError> {
        self.control_tx.send(cmd).await.map_err(|_| PipelineError::Shutdown)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
