// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn signed_header(signing: &SigningConfig, body: &[u8]) -> Header {
    Header {
        message_length: body.len() as u32,
        hmac_hash_function: Some(signing.hash as i32),
        hmac_signer: Some(signing.name.clone()),
        hmac_key_version: Some(signing.key_version),
        hmac: Some(signing.sign(body)),
        ..Default::default()
    }
}

#[parameterized(
    md5 = { HashFunction::Md5 },
    sha1 = { HashFunction::Sha1 },
)]
fn valid_signature_verifies(hash: HashFunction) {
    let signing = SigningConfig {
        name: "ingest".to_string(),
        key_version: 0,
        hash,
        key: "key-material".to_string(),
    };
    let mut table = SignerTable::default();
    table.insert("ingest", 0, "key-material");

    let header = signed_header(&signing, b"body");
    assert_eq!(table.verify(&header, b"body"), Verification::Valid("ingest".to_string()));
}

#[test]
fn unsigned_header_is_unsigned() {
    let table = SignerTable::default();
    let header = Header { message_length: 4, ..Default::default() };
    assert_eq!(table.verify(&header, b"body"), Verification::Unsigned);
}

#[test]
fn unknown_signer_is_invalid() {
    let signing = SigningConfig {
        name: "rogue".to_string(),
        key_version: 0,
        hash: HashFunction::Md5,
        key: "whatever".to_string(),
    };
    let mut table = SignerTable::default();
    table.insert("ingest", 0, "key-material");

    let header = signed_header(&signing, b"body");
    assert_eq!(table.verify(&header, b"body"), Verification::Invalid);
}

#[test]
fn wrong_key_version_is_invalid() {
    let signing = SigningConfig {
        name: "ingest".to_string(),
        key_version: 2,
        hash: HashFunction::Md5,
        key: "key-material".to_string(),
    };
    let mut table = SignerTable::default();
    table.insert("ingest", 0, "key-material");

    let header = signed_header(&signing, b"body");
    assert_eq!(table.verify(&header, b"body"), Verification::Invalid);
}

#[test]
fn tampered_body_is_invalid() {
    let signing = SigningConfig {
        name: "ingest".to_string(),
        key_version: 0,
        hash: HashFunction::Sha1,
        key: "key-material".to_string(),
    };
    let mut table = SignerTable::default();
    table.insert("ingest", 0, "key-material");

    let header = signed_header(&signing, b"body");
    assert_eq!(table.verify(&header, b"tampered"), Verification::Invalid);
}
