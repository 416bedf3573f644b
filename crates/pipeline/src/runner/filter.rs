// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter runner: drives a filter plugin over its matched packs and
//! ticker, with bounded re-injection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use weir_core::{PackPool, PackRef, RetryHelper, RetryOptions};

use crate::plugin::Filter;
use crate::report;
use crate::runner::{after_failure, RestartDecision};
use crate::PipelineError;

/// One event from the filter's select loop.
pub enum FilterEvent {
    Pack(PackRef),
    Tick,
    /// The inbox closed; the plugin must return.
    Shutdown,
}

/// Runner-facing capability handed to a filter plugin.
pub struct FilterHandle {
    name: String,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
    inbox: mpsc::Receiver<PackRef>,
    ticker: Option<Interval>,
    max_msg_loops: u32,
    process_budget: u32,
    timer_budget: u32,
    injected: u32,
    in_tick: bool,
}

impl FilterHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        pool: Arc<PackPool>,
        router_tx: mpsc::Sender<PackRef>,
        inbox: mpsc::Receiver<PackRef>,
        ticker_interval: Option<Duration>,
        max_msg_loops: u32,
        process_budget: u32,
        timer_budget: u32,
    ) -> Self {
        let ticker = ticker_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        Self {
            name,
            pool,
            router_tx,
            inbox,
            ticker,
            max_msg_loops,
            process_budget,
            timer_budget,
            injected: 0,
            in_tick: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next pack or tick. Resets the injection budget window.
    pub async fn next(&mut self) -> FilterEvent {
        self.injected = 0;
        match &mut self.ticker {
            Some(ticker) => tokio::select! {
                pack = self.inbox.recv() => match pack {
                    Some(pack) => {
                        self.in_tick = false;
                        FilterEvent::Pack(pack)
                    }
                    None => FilterEvent::Shutdown,
                },
                _ = ticker.tick() => {
                    self.in_tick = true;
                    FilterEvent::Tick
                }
            },
            None => match self.inbox.recv().await {
                Some(pack) => {
                    self.in_tick = false;
                    FilterEvent::Pack(pack)
                }
                None => FilterEvent::Shutdown,
            },
        }
    }

    /// A fresh pack from the inject recycle channel, hop counter set
    /// one past the parent's.
    pub async fn pipeline_pack(&self, parent_loop_count: u32) -> Result<PackRef, PipelineError> {
        if parent_loop_count + 1 > self.max_msg_loops {
            tracing::warn!(
                filter = %self.name,
                loops = parent_loop_count + 1,
                max = self.max_msg_loops,
                "inject refused: hop limit"
            );
            return Err(PipelineError::HopLimit(self.max_msg_loops));
        }
        let pack = self.pool.acquire_inject().await;
        pack.state_mut().msg_loop_count = parent_loop_count + 1;
        Ok(pack)
    }

    /// Injects a pack back into the router, debiting the per-event
    /// budget.
    pub async fn inject(&mut self, pack: PackRef) -> Result<(), PipelineError> {
        let budget = if self.in_tick { self.timer_budget } else { self.process_budget };
        if self.injected >= budget {
            self.pool.release(pack);
            return Err(PipelineError::InjectBudget(budget));
        }
        self.injected += 1;
        match self.router_tx.send(pack).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(pack)) => {
                self.pool.release(pack);
                Err(PipelineError::Shutdown)
            }
        }
    }

    pub fn release(&self, pack: PackRef) {
        self.pool.release(pack);
    }
}

pub(crate) struct FilterRunner {
    name: String,
    plugin: Box<dyn Filter>,
    retry: RetryHelper,
    pool: Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
}

impl FilterRunner {
    pub fn new(
        name: String,
        plugin: Box<dyn Filter>,
        retry: RetryOptions,
        pool: Arc<PackPool>,
        router_tx: mpsc::Sender<PackRef>,
    ) -> Self {
        Self { name, plugin, retry: RetryHelper::new(retry), pool, router_tx }
    }

    pub fn spawn(self, handle: FilterHandle) -> JoinHandle<()> {
        tokio::spawn(self.run(handle))
    }

    async fn run(mut self, mut handle: FilterHandle) {
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
            match self.plugin.run(&mut handle).await {
                Ok(()) => {
                    tracing::debug!(filter = %self.name, "filter finished");
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
                        RestartDecision::Retry => self.plugin.cleanup_for_restart(),
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
        tracing::error!(filter = %self.name, reason, "filter terminated");
        report::publish_terminated(&self.pool, &self.router_tx, &self.name, reason).await;
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
