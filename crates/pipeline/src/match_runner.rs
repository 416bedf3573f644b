// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match runner: evaluates one plugin's compiled matcher against every
//! routed pack, forwarding matches and releasing the rest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weir_core::{Clock, PackPool, PackRef};
use weir_matcher::MatcherSpecification;

use crate::sample::DurationSampler;

/// Shared evaluation counters, read by the report stream.
#[derive(Default)]
pub struct MatchStats {
    pub duration_ns: AtomicU64,
    pub samples: AtomicU64,
    pub matched: AtomicU64,
    pub dropped: AtomicU64,
}

pub(crate) struct MatchRunner<C: Clock> {
    name: String,
    matcher: MatcherSpecification,
    signer: String,
    pool: Arc<PackPool>,
    inbox: mpsc::Receiver<PackRef>,
    forward: mpsc::Sender<PackRef>,
    sampler: DurationSampler<C>,
    stats: Arc<MatchStats>,
}

impl<C: Clock> MatchRunner<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        matcher: MatcherSpecification,
        signer: String,
        pool: Arc<PackPool>,
        inbox: mpsc::Receiver<PackRef>,
        forward: mpsc::Sender<PackRef>,
        clock: C,
        stats: Arc<MatchStats>,
    ) -> Self {
        let sampler = DurationSampler::new(clock, 1000);
        Self { name, matcher, signer, pool, inbox, forward, sampler, stats }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(pack) = self.inbox.recv().await {
            if !self.signer.is_empty() && pack.state().signer != self.signer {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.pool.release(pack);
                continue;
            }

            let matched = {
                let state = pack.state();
                let matcher = &self.matcher;
                self.sampler.measure(|| matcher.is_match(&state.message))
            };
            let (duration, samples) = self.sampler.snapshot();
            self.stats.duration_ns.store(duration.as_nanos() as u64, Ordering::Relaxed);
            self.stats.samples.store(samples, Ordering::Relaxed);

            if matched {
                self.stats.matched.fetch_add(1, Ordering::Relaxed);
                if self.forward.send(pack.clone()).await.is_err() {
                    // Plugin went away during shutdown.
                    self.pool.release(pack);
                    break;
                }
            } else {
                self.pool.release(pack);
            }
        }
        tracing::debug!(matcher = %self.name, "match runner stopped");
    }
}

#[cfg(test)]
#[path = "match_runner_tests.rs"]
mod tests;
