// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message signing and verification.
//!
//! Keys are looked up as `"<signer>_<key_version>"`; comparison is
//! constant time via the Mac verifier.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;

use crate::header::{HashFunction, Header};

/// Outbound signing identity for one writer.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub name: String,
    pub key_version: u32,
    pub hash: HashFunction,
    pub key: String,
}

impl SigningConfig {
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let key = self.key.as_bytes();
        match self.hash {
            HashFunction::Md5 => match Hmac::<Md5>::new_from_slice(key) {
                Ok(mut mac) => {
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                // hmac accepts any key length
                Err(_) => Vec::new(),
            },
            HashFunction::Sha1 => match Hmac::<Sha1>::new_from_slice(key) {
                Ok(mut mac) => {
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                Err(_) => Vec::new(),
            },
        }
    }
}

/// Result of checking a record's header against the signer table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No HMAC in the header.
    Unsigned,
    /// HMAC matched; carries the signer name.
    Valid(String),
    /// Unknown signer/version or HMAC mismatch. Drop the record.
    Invalid,
}

#[derive(Debug, Clone, Default)]
pub struct SignerTable {
    keys: HashMap<String, String>,
}

impl SignerTable {
    pub fn insert(&mut self, signer: &str, key_version: u32, key: impl Into<String>) {
        self.keys.insert(format!("{signer}_{key_version}"), key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn verify(&self, header: &Header, body: &[u8]) -> Verification {
        let Some(tag) = header.hmac.as_deref() else {
            return Verification::Unsigned;
        };
        let signer = header.hmac_signer();
        let lookup = format!("{}_{}", signer, header.hmac_key_version());
        let Some(key) = self.keys.get(&lookup) else {
            return Verification::Invalid;
        };
        let ok = match header.hmac_hash_function() {
            HashFunction::Md5 => verify_md5(key.as_bytes(), body, tag),
            HashFunction::Sha1 => verify_sha1(key.as_bytes(), body, tag),
        };
        if ok {
            Verification::Valid(signer.to_string())
        } else {
            Verification::Invalid
        }
    }
}

fn verify_md5(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = Hmac::<Md5>::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

fn verify_sha1(key: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

#[cfg(test)]
#[path = "signer_tests.rs"]
mod tests;
