// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disk-backed output queue.
//!
//! A queue directory holds numbered `N.log` segment files of framed
//! records plus one `checkpoint.txt` cursor file. Exactly one writer
//! appends and exactly one reader consumes; the shared byte count is
//! the only state they both touch.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod checkpoint;
mod reader;
mod writer;

pub use checkpoint::Checkpoint;
pub use reader::{QueueReader, ReadOutcome};
pub use writer::QueueWriter;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use weir_core::BufferConfig;
use weir_wire::WireError;

pub const CHECKPOINT_FILE: &str = "checkpoint.txt";

#[derive(Debug, Error)]
pub enum QueueError {
    /// The configured buffer cap would be exceeded.
    #[error("disk queue is full")]
    Full,
    /// The queue is unusable until an operator intervenes.
    #[error("disk queue corrupt: {0}")]
    Corrupt(String),
    /// The supplied cursor is behind the stored cursor; the record was
    /// already acknowledged.
    #[error("cursor {0:?} is behind the stored cursor")]
    CursorPast(String),
    #[error("malformed cursor {0:?}")]
    BadCursor(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// State shared between the writer and reader halves.
pub(crate) struct Shared {
    pub dir: PathBuf,
    pub total_size: AtomicU64,
    pub max_file_size: u64,
    pub max_buffer_size: u64,
    pub corrupt: AtomicBool,
}

impl Shared {
    pub fn is_corrupt(&self) -> bool {
        self.corrupt.load(Ordering::Acquire)
    }

    pub fn mark_corrupt(&self) {
        self.corrupt.store(true, Ordering::Release);
    }
}

/// Opens (creating if needed) the queue at `dir`, returning its writer
/// and reader halves.
pub fn open(dir: &Path, config: &BufferConfig) -> Result<(QueueWriter, QueueReader), QueueError> {
    std::fs::create_dir_all(dir)?;
    let segments = list_segments(dir)?;
    let mut total = 0u64;
    for &id in &segments {
        total += std::fs::metadata(segment_path(dir, id))?.len();
    }
    let shared = Arc::new(Shared {
        dir: dir.to_path_buf(),
        total_size: AtomicU64::new(total),
        max_file_size: config.max_file_size,
        max_buffer_size: config.max_buffer_size,
        corrupt: AtomicBool::new(false),
    });
    let writer = QueueWriter::open(Arc::clone(&shared), segments.last().copied().unwrap_or(0))?;
    let reader = QueueReader::open(shared, config.cursor_update_count)?;
    Ok((writer, reader))
}

pub(crate) fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{id}.log"))
}

/// Segment ids present in the directory, ascending.
pub(crate) fn list_segments(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(".log") {
            if let Ok(id) = stem.parse::<u64>() {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Parses an opaque `"id offset"` cursor.
pub(crate) fn parse_cursor(cursor: &str) -> Result<(u64, u64), QueueError> {
    let bad = || QueueError::BadCursor(cursor.to_string());
    let mut parts = cursor.split_whitespace();
    let id = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let offset = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok((id, offset))
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
