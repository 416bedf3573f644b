// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Regex-delimited splitter.
//!
//! The pattern may carry at most one capture group. Without one, the
//! whole match is the delimiter; with one, only the captured bytes are
//! kept as delimiter and the rest of the match is dropped. A location
//! flag decides whether the kept delimiter ends the preceding record
//! or starts the following one.

use std::ops::Range;

use regex::bytes::Regex;

use crate::splitter::RecordSplitter;
use crate::WireError;

pub struct RegexSplitter {
    delimiter: Regex,
    delimiter_eol: bool,
    /// Bytes at the window head held back as the next record's leading
    /// delimiter (start-location mode only).
    lead: usize,
}

impl RegexSplitter {
    /// `delimiter_eol = true` attaches the delimiter to the end of the
    /// preceding record; `false` to the start of the following one.
    pub fn new(pattern: &str, delimiter_eol: bool) -> Result<Self, WireError> {
        let delimiter = Regex::new(pattern)?;
        if delimiter.captures_len() > 2 {
            return Err(WireError::TooManyCaptures);
        }
        Ok(Self { delimiter, delimiter_eol, lead: 0 })
    }
}

impl RecordSplitter for RegexSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        if buf.len() <= self.lead {
            return (0, None);
        }
        let Some(caps) = self.delimiter.captures(&buf[self.lead..]) else {
            return (0, None);
        };
        let Some(full) = caps.get(0) else {
            return (0, None);
        };
        if full.start() == full.end() {
            // Zero-width delimiter match makes no progress.
            return (0, None);
        }
        let kept = caps.get(1).unwrap_or(full);

        if self.delimiter_eol {
            let record = 0..self.lead + kept.end();
            let consumed = self.lead + full.end();
            self.lead = 0;
            (consumed, Some(record))
        } else {
            let record = 0..self.lead + full.start();
            let consumed = self.lead + kept.start();
            self.lead = kept.end() - kept.start();
            (consumed, Some(record))
        }
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
