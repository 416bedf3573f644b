// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor checkpoint file: a single `"id offset"` line, truncated to
//! the exact string length after every write.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{parse_cursor, QueueError};

pub struct Checkpoint {
    file: File,
}

impl Checkpoint {
    pub fn open(path: &Path) -> Result<Self, QueueError> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(Self { file })
    }

    /// The stored cursor, or None for a fresh (empty) checkpoint.
    pub fn load(&mut self) -> Result<Option<(u64, u64)>, QueueError> {
        let mut contents = String::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut contents)?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        parse_cursor(trimmed).map(Some)
    }

    pub fn persist(&mut self, id: u64, offset: u64) -> Result<(), QueueError> {
        let line = format!("{id} {offset}");
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(line.as_bytes())?;
        self.file.set_len(line.len() as u64)?;
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
