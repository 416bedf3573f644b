// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use prost::Message as _;
use weir_core::{FakeClock, Message};

use crate::codec::ProtobufDecoder;
use crate::plugin::{Decoder as DecoderTrait, Plugin};

struct Fixture {
    pool: Arc<PackPool>,
    inbox_tx: mpsc::Sender<PackRef>,
    router_rx: mpsc::Receiver<PackRef>,
}

fn start(plugin: Box<dyn DecoderTrait>, error_sink: Option<mpsc::Sender<PackRef>>) -> Fixture {
    let pool = PackPool::new(2);
    let (inbox_tx, inbox_rx) = mpsc::channel(4);
    let (router_tx, router_rx) = mpsc::channel(4);
    DecoderRunner::new(
        "test-decoder".to_string(),
        plugin,
        inbox_rx,
        router_tx,
        error_sink,
        Arc::clone(&pool),
        FakeClock::new(),
    )
    .spawn();
    Fixture { pool, inbox_tx, router_rx }
}

#[tokio::test]
async fn decoded_pack_reaches_the_router() {
    let mut fx = start(Box::new(ProtobufDecoder), None);

    let mut message = Message::new("decoded");
    message.payload = Some("body".to_string());
    let pack = fx.pool.acquire().await;
    pack.state_mut().msg_bytes = message.encode_to_vec();
    fx.inbox_tx.send(pack).await.unwrap();

    let routed = fx.router_rx.recv().await.unwrap();
    let state = routed.state();
    assert_eq!(state.message, message);
    assert!(state.decoded);
}

#[tokio::test]
async fn decode_failure_without_sink_releases_the_pack() {
    let fx = start(Box::new(ProtobufDecoder), None);

    // Drain the pool so the garbage pack is the only one outstanding.
    let pack = fx.pool.acquire().await;
    let hold = fx.pool.acquire().await;
    pack.state_mut().msg_bytes = b"\xffgarbage".to_vec();
    fx.inbox_tx.send(pack).await.unwrap();

    // The only way a pack becomes available is the decoder releasing it.
    for _ in 0..200 {
        if fx.pool.try_acquire().is_some() {
            fx.pool.release(hold);
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("failed pack never released");
}

#[tokio::test]
async fn decode_failure_routes_to_the_error_sink() {
    let (sink_tx, mut sink_rx) = mpsc::channel(4);
    let fx = start(Box::new(ProtobufDecoder), Some(sink_tx));

    let pack = fx.pool.acquire().await;
    pack.state_mut().msg_bytes = b"\xffgarbage".to_vec();
    fx.inbox_tx.send(pack).await.unwrap();

    let failed = sink_rx.recv().await.unwrap();
    assert_eq!(failed.state().msg_bytes, b"\xffgarbage");
}

/// Splits one pack into packs carrying each line of the payload bytes.
struct SplittingDecoder {
    pool: Arc<PackPool>,
}

impl Plugin for SplittingDecoder {}

impl DecoderTrait for SplittingDecoder {
    fn decode(&mut self, pack: &PackRef) -> Result<DecodeOutcome, PluginError> {
        let lines: Vec<Vec<u8>> = pack
            .state()
            .msg_bytes
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        let mut packs = Vec::new();
        for line in lines {
            let split = self
                .pool
                .try_acquire()
                .ok_or_else(|| PluginError::recoverable("pool exhausted"))?;
            {
                let mut state = split.state_mut();
                let mut message = Message::new("line");
                message.payload = Some(String::from_utf8_lossy(&line).into_owned());
                state.message = message;
                state.decoded = true;
            }
            packs.push(split);
        }
        Ok(DecodeOutcome::Many(packs))
    }
}

#[tokio::test]
async fn splitting_decoder_forwards_every_pack() {
    let pool = PackPool::new(8);
    let (inbox_tx, inbox_rx) = mpsc::channel(4);
    let (router_tx, mut router_rx) = mpsc::channel(8);
    DecoderRunner::new(
        "splitter".to_string(),
        Box::new(SplittingDecoder { pool: Arc::clone(&pool) }),
        inbox_rx,
        router_tx,
        None,
        Arc::clone(&pool),
        FakeClock::new(),
    )
    .spawn();

    let pack = pool.acquire().await;
    pack.state_mut().msg_bytes = b"one\ntwo\n".to_vec();
    inbox_tx.send(pack).await.unwrap();

    let first = router_rx.recv().await.unwrap();
    let second = router_rx.recv().await.unwrap();
    assert_eq!(first.state().message.payload(), "one");
    assert_eq!(second.state().message.payload(), "two");
}
