// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter and an attempt cap.
//!
//! Used by plugin runners between restarts and by buffered outputs
//! between delivery attempts.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("retry limit of {0} attempts exhausted")]
    Exhausted(i32),
}

/// Per-plugin retry configuration. Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
    /// -1 means unlimited.
    pub max_retries: i32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            delay_ms: 250,
            max_delay_ms: 30_000,
            max_jitter_ms: 500,
            max_retries: -1,
        }
    }
}

pub struct RetryHelper {
    opts: RetryOptions,
    cur_delay: Duration,
    attempts: u32,
}

impl RetryHelper {
    pub fn new(opts: RetryOptions) -> Self {
        let cur_delay = Duration::from_millis(opts.delay_ms);
        Self { opts, cur_delay, attempts: 0 }
    }

    /// Sleeps `cur_delay + uniform(0, max_jitter)`, then doubles the
    /// delay capped at the maximum. Fails once the attempt count would
    /// exceed `max_retries`.
    pub async fn wait(&mut self) -> Result<(), RetryError> {
        if self.opts.max_retries >= 0 && self.attempts >= self.opts.max_retries as u32 {
            return Err(RetryError::Exhausted(self.opts.max_retries));
        }
        let jitter = if self.opts.max_jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=self.opts.max_jitter_ms))
        } else {
            Duration::ZERO
        };
        tokio::time::sleep(self.cur_delay + jitter).await;
        self.cur_delay = (self.cur_delay * 2).min(Duration::from_millis(self.opts.max_delay_ms));
        self.attempts += 1;
        Ok(())
    }

    /// Back to the base delay and zero attempts.
    pub fn reset(&mut self) {
        self.cur_delay = Duration::from_millis(self.opts.delay_ms);
        self.attempts = 0;
    }

    pub fn times_waited(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
