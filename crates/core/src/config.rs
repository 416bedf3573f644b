// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration surface consumed from the config loader.
//!
//! The loader itself (TOML files, CLI flags) lives outside the core;
//! these structs are what it deserializes into.

use std::path::PathBuf;

use serde::Deserialize;

/// Process-wide pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Maximum pack hop count before a re-injection is refused.
    pub max_msg_loops: u32,
    /// Injection budget per process-message invocation of a filter.
    pub max_msg_process_inject: u32,
    /// Injection budget per timer tick of a filter.
    pub max_msg_timer_inject: u32,
    /// Beyond this a slow filter may be reported for termination.
    pub max_msg_process_duration_ns: u64,
    /// Capacity of every plugin inbox channel.
    pub plugin_chan_size: usize,
    /// Packs per recycle channel.
    pub pool_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_msg_loops: 4,
            max_msg_process_inject: 1,
            max_msg_timer_inject: 10,
            max_msg_process_duration_ns: 100_000_000,
            plugin_chan_size: 30,
            pool_size: 100,
        }
    }
}

/// What a buffered output does when its disk queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullAction {
    /// Stop the output; the daemon treats this as fatal for the plugin.
    Shutdown,
    /// Drop the record and keep going.
    Drop,
    /// Wait for the reader to free space.
    Block,
}

/// Per-output disk buffering settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Directory holding the output's segments and checkpoint.
    pub queue_dir: PathBuf,
    /// Roll to a new segment beyond this many bytes.
    pub max_file_size: u64,
    /// Total cap across segments; 0 disables the cap.
    pub max_buffer_size: u64,
    pub full_action: FullAction,
    /// Persist the checkpoint every N same-file cursor advances.
    pub cursor_update_count: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            queue_dir: PathBuf::new(),
            max_file_size: 128 * 1024 * 1024,
            max_buffer_size: 0,
            full_action: FullAction::Shutdown,
            cursor_update_count: 1,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
