// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue feeder: appends framed records, rolling segments at the size
//! cap and refusing writes past the buffer cap.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use weir_wire::write_framed;

use crate::{segment_path, QueueError, Shared};

pub struct QueueWriter {
    shared: Arc<Shared>,
    file: File,
    write_id: u64,
    file_size: u64,
    frame_buf: Vec<u8>,
}

impl QueueWriter {
    pub(crate) fn open(shared: Arc<Shared>, write_id: u64) -> Result<Self, QueueError> {
        let path = segment_path(&shared.dir, write_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { shared, file, write_id, file_size, frame_buf: Vec::new() })
    }

    /// Appends one framed record holding `msg_bytes`.
    ///
    /// Fails with `Full` when the configured buffer cap would be
    /// exceeded; a partially written record is repaired by truncating
    /// the segment, and only a failed truncation marks the queue
    /// corrupt.
    pub fn append(&mut self, msg_bytes: &[u8]) -> Result<(), QueueError> {
        if self.shared.is_corrupt() {
            return Err(QueueError::Corrupt("queue previously marked corrupt".to_string()));
        }
        self.frame_buf.clear();
        write_framed(&mut self.frame_buf, msg_bytes, None)?;
        let record_len = self.frame_buf.len() as u64;

        let total = self.shared.total_size.load(Ordering::Acquire);
        if self.shared.max_buffer_size > 0 && total + record_len > self.shared.max_buffer_size {
            return Err(QueueError::Full);
        }
        if self.file_size > 0 && self.file_size + record_len > self.shared.max_file_size {
            self.roll()?;
        }

        if let Err(err) = self.file.write_all(&self.frame_buf) {
            return match self.file.set_len(self.file_size) {
                Ok(()) => Err(QueueError::Io(err)),
                Err(truncate_err) => {
                    self.shared.mark_corrupt();
                    Err(QueueError::Corrupt(format!(
                        "write failed ({err}) and truncate failed ({truncate_err})"
                    )))
                }
            };
        }
        self.file_size += record_len;
        self.shared.total_size.fetch_add(record_len, Ordering::AcqRel);
        Ok(())
    }

    /// Position a reader would need to reach to drain everything
    /// written so far.
    pub fn write_cursor(&self) -> String {
        format!("{} {}", self.write_id, self.file_size)
    }

    pub fn write_id(&self) -> u64 {
        self.write_id
    }

    pub fn total_size(&self) -> u64 {
        self.shared.total_size.load(Ordering::Acquire)
    }

    fn roll(&mut self) -> Result<(), QueueError> {
        self.write_id += 1;
        let path = segment_path(&self.shared.dir, self.write_id);
        self.file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.file_size = 0;
        tracing::debug!(segment = self.write_id, "rolled queue segment");
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
