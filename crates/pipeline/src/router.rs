// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The message router: a single task fanning every pack out to all
//! registered matcher inboxes.
//!
//! Reference discipline: the router retains once per destination, then
//! releases its own reference. Every destination releases exactly once
//! downstream, match or no match.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weir_core::{PackPool, PackRef};

/// A registered destination: the inbox of one match runner.
pub(crate) struct MatcherEntry {
    pub name: String,
    pub tx: mpsc::Sender<PackRef>,
}

pub(crate) enum RouterCmd {
    AddFilter(MatcherEntry),
    RemoveFilter(String),
    AddOutput(MatcherEntry),
    RemoveOutput(String),
}

pub(crate) struct Router {
    pool: Arc<PackPool>,
    inbox: mpsc::Receiver<PackRef>,
    control: mpsc::Receiver<RouterCmd>,
    filters: Vec<Option<MatcherEntry>>,
    outputs: Vec<Option<MatcherEntry>>,
}

impl Router {
    pub fn new(
        pool: Arc<PackPool>,
        inbox: mpsc::Receiver<PackRef>,
        control: mpsc::Receiver<RouterCmd>,
    ) -> Self {
        Self { pool, inbox, control, filters: Vec::new(), outputs: Vec::new() }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut control_open = true;
        loop {
            tokio::select! {
                biased;
                cmd = self.control.recv(), if control_open => match cmd {
                    Some(cmd) => self.handle_cmd(cmd),
                    None => control_open = false,
                },
                pack = self.inbox.recv() => match pack {
                    Some(pack) => self.fan_out(pack).await,
                    None => break,
                },
            }
            tokio::task::yield_now().await;
        }
        // Dropping the entries closes every matcher inbox.
        self.filters.clear();
        self.outputs.clear();
        tracing::debug!("router stopped");
    }

    fn handle_cmd(&mut self, cmd: RouterCmd) {
        match cmd {
            RouterCmd::AddFilter(entry) => Self::add(&mut self.filters, entry),
            RouterCmd::RemoveFilter(name) => Self::remove(&mut self.filters, &name),
            RouterCmd::AddOutput(entry) => Self::add(&mut self.outputs, entry),
            RouterCmd::RemoveOutput(name) => Self::remove(&mut self.outputs, &name),
        }
    }

    fn add(slots: &mut Vec<Option<MatcherEntry>>, entry: MatcherEntry) {
        if slots.iter().flatten().any(|e| e.name == entry.name) {
            tracing::warn!(matcher = %entry.name, "duplicate matcher registration ignored");
            return;
        }
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(entry),
            None => slots.push(Some(entry)),
        }
    }

    fn remove(slots: &mut [Option<MatcherEntry>], name: &str) {
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.name == name) {
                // Dropping the sender closes the runner's inbox.
                *slot = None;
                return;
            }
        }
        tracing::warn!(matcher = name, "remove for unregistered matcher");
    }

    /// Filters first, then outputs, in slot order.
    async fn fan_out(&self, pack: PackRef) {
        pack.state_mut().diagnostics.clear();
        for entry in self.filters.iter().flatten().chain(self.outputs.iter().flatten()) {
            self.pool.retain(&pack);
            pack.state_mut().diagnostics.push(entry.name.clone());
            if entry.tx.send(pack.clone()).await.is_err() {
                // Inbox closed mid-shutdown; drop this destination's ref.
                self.pool.release(pack.clone());
            }
        }
        self.pool.release(pack);
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
