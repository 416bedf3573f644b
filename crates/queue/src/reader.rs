// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue delivery reader: drives a framing splitter over segments,
//! hands out records with their cursors, and prunes segments the
//! cursor has moved past.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use weir_wire::{
    decode_frame, FramingSplitter, Split, StreamSplitter, WireError, DEFAULT_MAX_MESSAGE_SIZE,
};

use crate::checkpoint::Checkpoint;
use crate::{list_segments, segment_path, QueueError, Shared, CHECKPOINT_FILE};

/// One step of the delivery loop.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A record to deliver. The cursor names the position after the
    /// record; acknowledge by passing it to `advance_cursor`.
    Record { msg_bytes: Vec<u8>, cursor: String },
    /// Caught up with the writer; wait before polling again.
    Pending,
}

pub struct QueueReader {
    shared: Arc<Shared>,
    file: File,
    read_id: u64,
    base_offset: u64,
    splitter: StreamSplitter<FramingSplitter>,
    checkpoint: Checkpoint,
    cursor_id: u64,
    cursor_offset: u64,
    cursor_update_count: u32,
    updates_since_persist: u32,
}

impl QueueReader {
    pub(crate) fn open(
        shared: Arc<Shared>,
        cursor_update_count: u32,
    ) -> Result<Self, QueueError> {
        let mut checkpoint = Checkpoint::open(&shared.dir.join(CHECKPOINT_FILE))?;
        let stored = checkpoint.load()?;
        let segments = list_segments(&shared.dir)?;

        let (read_id, offset) = match stored {
            Some((id, offset)) if segments.contains(&id) => (id, offset),
            // Stale checkpoint (segment already pruned): resume at the
            // earliest surviving segment.
            Some((id, _)) => {
                let fallback = segments
                    .iter()
                    .copied()
                    .find(|&sid| sid > id)
                    .or_else(|| segments.last().copied())
                    .unwrap_or(0);
                (fallback, 0)
            }
            None => (segments.first().copied().unwrap_or(0), 0),
        };

        let mut file = File::open(segment_path(&shared.dir, read_id))?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(Self {
            shared,
            file,
            read_id,
            base_offset: offset,
            splitter: StreamSplitter::new(FramingSplitter::new(DEFAULT_MAX_MESSAGE_SIZE)),
            checkpoint,
            cursor_id: read_id,
            cursor_offset: offset,
            cursor_update_count: cursor_update_count.max(1),
            updates_since_persist: 0,
        })
    }

    /// Returns the next queued record, moving to the next segment when
    /// the current one is exhausted. `Pending` means the reader has
    /// caught up with the writer.
    pub fn next_record(&mut self) -> Result<ReadOutcome, QueueError> {
        loop {
            match self.splitter.next(&mut self.file) {
                Ok(Split::Record(record)) => {
                    let (_, body) = decode_frame(record)
                        .map_err(|err| QueueError::Corrupt(err.to_string()))?;
                    let msg_bytes = body.to_vec();
                    let offset = self.base_offset + self.splitter.consumed();
                    let cursor = format!("{} {}", self.read_id, offset);
                    return Ok(ReadOutcome::Record { msg_bytes, cursor });
                }
                Ok(Split::Truncated(_)) => {
                    return Err(QueueError::Corrupt("truncated record in segment".to_string()));
                }
                Ok(Split::Eof) => {
                    let next = list_segments(&self.shared.dir)?
                        .into_iter()
                        .find(|&id| id > self.read_id);
                    let Some(next) = next else {
                        return Ok(ReadOutcome::Pending);
                    };
                    if !self.splitter.remaining().is_empty() {
                        tracing::warn!(
                            segment = self.read_id,
                            bytes = self.splitter.remaining().len(),
                            "discarding partial record at end of segment"
                        );
                    }
                    self.open_segment(next)?;
                }
                Err(WireError::ShortBuffer) => {
                    return Err(QueueError::Corrupt("oversized record in segment".to_string()));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Acknowledges delivery up to `cursor`.
    ///
    /// Same-segment advances batch checkpoint persistence; moving to a
    /// new segment persists immediately and deletes everything behind
    /// it. A cursor behind the stored one fails with `CursorPast`.
    pub fn advance_cursor(&mut self, cursor: &str) -> Result<(), QueueError> {
        let (id, offset) = crate::parse_cursor(cursor)?;
        if id < self.cursor_id || (id == self.cursor_id && offset < self.cursor_offset) {
            return Err(QueueError::CursorPast(cursor.to_string()));
        }
        if id == self.cursor_id {
            if offset == self.cursor_offset {
                return Ok(());
            }
            self.cursor_offset = offset;
            self.updates_since_persist += 1;
            if self.updates_since_persist >= self.cursor_update_count {
                self.checkpoint.persist(id, offset)?;
                self.updates_since_persist = 0;
            }
        } else {
            self.cursor_id = id;
            self.cursor_offset = offset;
            self.checkpoint.persist(id, offset)?;
            self.updates_since_persist = 0;
            self.remove_segments_below(id)?;
        }
        Ok(())
    }

    pub fn cursor(&self) -> String {
        format!("{} {}", self.cursor_id, self.cursor_offset)
    }

    pub fn total_size(&self) -> u64 {
        self.shared.total_size.load(Ordering::Acquire)
    }

    fn open_segment(&mut self, id: u64) -> Result<(), QueueError> {
        let exhausted = segment_path(&self.shared.dir, self.read_id);
        let removed = std::fs::metadata(&exhausted).map(|m| m.len()).unwrap_or(0);
        if std::fs::remove_file(&exhausted).is_ok() {
            self.shared.total_size.fetch_sub(removed, Ordering::AcqRel);
        }
        self.file = File::open(segment_path(&self.shared.dir, id))?;
        self.read_id = id;
        self.base_offset = 0;
        self.splitter = StreamSplitter::new(FramingSplitter::new(DEFAULT_MAX_MESSAGE_SIZE));
        Ok(())
    }

    fn remove_segments_below(&mut self, id: u64) -> Result<(), QueueError> {
        for sid in list_segments(&self.shared.dir)? {
            if sid >= id {
                break;
            }
            let path = segment_path(&self.shared.dir, sid);
            let size = std::fs::metadata(&path)?.len();
            std::fs::remove_file(&path)?;
            self.shared.total_size.fetch_sub(size, Ordering::AcqRel);
            tracing::debug!(segment = sid, "pruned acknowledged queue segment");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
