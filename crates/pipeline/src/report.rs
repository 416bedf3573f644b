// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report messages emitted by the core through the router.

use std::sync::Arc;

use tokio::sync::mpsc;
use weir_core::{Field, Message, PackPool, PackRef};

pub const TYPE_ALL_REPORT: &str = "weir.all-report";
pub const TYPE_TERMINATED: &str = "weir.terminated";
pub const TYPE_SANDBOX_TERMINATED: &str = "weir.sandbox-terminated";
pub const TYPE_SANDBOX_OUTPUT: &str = "weir.sandbox-output";

/// One plugin's row in the all-report message.
pub struct ReportEntry {
    pub name: String,
    pub matched: u64,
    pub dropped: u64,
    pub sample_ns: u64,
    pub samples: u64,
}

/// Builds the `weir.all-report` message from runner diagnostics.
pub fn all_report_message(entries: &[ReportEntry], timestamp: i64) -> Message {
    let mut message = Message::new(TYPE_ALL_REPORT);
    message.timestamp = timestamp;
    message.logger = Some("weir".to_string());
    for entry in entries {
        message.add_field(Field::new("Plugin", entry.name.as_str()));
        message.add_field(
            Field::new(format!("{}.Matched", entry.name), entry.matched as i64)
                .with_representation("count"),
        );
        message.add_field(
            Field::new(format!("{}.Dropped", entry.name), entry.dropped as i64)
                .with_representation("count"),
        );
        message.add_field(
            Field::new(format!("{}.MatchAvgDuration", entry.name), avg_ns(entry) as i64)
                .with_representation("ns"),
        );
    }
    message
}

fn avg_ns(entry: &ReportEntry) -> u64 {
    if entry.samples == 0 {
        0
    } else {
        entry.sample_ns / entry.samples
    }
}

/// Builds and routes a `weir.terminated` report for a plugin that will
/// not be restarted.
pub(crate) async fn publish_terminated(
    pool: &Arc<PackPool>,
    router_tx: &mpsc::Sender<PackRef>,
    plugin: &str,
    reason: &str,
) {
    let pack = pool.acquire_inject().await;
    {
        let mut state = pack.state_mut();
        let mut message = Message::new(TYPE_TERMINATED);
        message.logger = Some(plugin.to_string());
        message.payload = Some(reason.to_string());
        message.add_field(Field::new("plugin", plugin));
        state.message = message;
    }
    if let Err(mpsc::error::SendError(pack)) = router_tx.send(pack).await {
        pool.release(pack);
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
