// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin runners: per-plugin supervisors owning the task, the inbox,
//! and the restart policy.

pub(crate) mod decoder;
pub(crate) mod filter;
pub(crate) mod input;
pub(crate) mod output;

use weir_core::{RetryError, RetryHelper};

use crate::plugin::PluginError;

/// What a runner does after its plugin failed.
pub(crate) enum RestartDecision {
    Retry,
    GiveUp(String),
}

/// Consults the restart policy and, when retrying, waits out the
/// backoff first.
pub(crate) async fn after_failure(
    name: &str,
    restartable: bool,
    error: &PluginError,
    retry: &mut RetryHelper,
) -> RestartDecision {
    if error.is_fatal() || !restartable {
        return RestartDecision::GiveUp(error.to_string());
    }
    tracing::warn!(plugin = name, error = %error, "plugin failed, scheduling restart");
    match retry.wait().await {
        Ok(()) => RestartDecision::Retry,
        Err(RetryError::Exhausted(limit)) => {
            RestartDecision::GiveUp(format!("{error} (retries exhausted after {limit})"))
        }
    }
}
