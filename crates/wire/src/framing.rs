// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed binary frame splitter.
//!
//! Frames open with the record separator and declare their body length
//! in a protobuf header. On a bad header the splitter resynchronises by
//! scanning forward to the next record separator, counting what it
//! threw away.

use std::ops::Range;

use prost::Message as _;

use crate::header::{Header, RECORD_SEPARATOR, UNIT_SEPARATOR};
use crate::signer::{SignerTable, Verification};
use crate::splitter::RecordSplitter;

pub struct FramingSplitter {
    max_message_size: usize,
    signers: Option<SignerTable>,
    last_signer: Option<String>,
    discarded_bytes: u64,
    skipped_records: u64,
}

impl FramingSplitter {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            signers: None,
            last_signer: None,
            discarded_bytes: 0,
            skipped_records: 0,
        }
    }

    /// Verify record HMACs against `signers`; records failing
    /// verification are skipped, not delivered.
    pub fn with_signers(mut self, signers: SignerTable) -> Self {
        self.signers = Some(signers);
        self
    }

    /// Signer of the most recently delivered record, when it was signed.
    pub fn signer(&self) -> Option<&str> {
        self.last_signer.as_deref()
    }

    /// Bytes thrown away during resynchronisation.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }

    /// Records dropped for failed signature verification.
    pub fn skipped_records(&self) -> u64 {
        self.skipped_records
    }

    /// Skip the leading record separator and everything up to the next
    /// one (or the whole window when none follows).
    fn resync(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        let skip = match memchr::memchr(RECORD_SEPARATOR, &buf[1..]) {
            Some(off) => off + 1,
            None => buf.len(),
        };
        self.discarded_bytes += skip as u64;
        (skip, None)
    }
}

impl RecordSplitter for FramingSplitter {
    fn find_record(&mut self, buf: &[u8]) -> (usize, Option<Range<usize>>) {
        let Some(sep) = memchr::memchr(RECORD_SEPARATOR, buf) else {
            self.discarded_bytes += buf.len() as u64;
            return (buf.len(), None);
        };
        if sep > 0 {
            self.discarded_bytes += sep as u64;
            return (sep, None);
        }

        if buf.len() < 2 {
            return (0, None);
        }
        let header_len = buf[1] as usize;
        let unit_at = 2 + header_len;
        if buf.len() <= unit_at {
            return (0, None);
        }
        if buf[unit_at] != UNIT_SEPARATOR {
            return self.resync(buf);
        }
        let header = match Header::decode(&buf[2..unit_at]) {
            Ok(header) => header,
            Err(_) => return self.resync(buf),
        };
        let message_len = header.message_length as usize;
        if message_len > self.max_message_size {
            tracing::warn!(message_len, max = self.max_message_size, "oversized message skipped");
            return self.resync(buf);
        }
        let total = unit_at + 1 + message_len;
        if buf.len() < total {
            return (0, None);
        }

        if let Some(signers) = &self.signers {
            let body = &buf[unit_at + 1..total];
            match signers.verify(&header, body) {
                Verification::Unsigned => self.last_signer = None,
                Verification::Valid(signer) => self.last_signer = Some(signer),
                Verification::Invalid => {
                    self.skipped_records += 1;
                    tracing::warn!(
                        signer = header.hmac_signer(),
                        key_version = header.hmac_key_version(),
                        "record dropped: signature verification failed"
                    );
                    return (total, None);
                }
            }
        }
        (total, Some(0..total))
    }
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
