// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use weir_core::Message;

use crate::plugin::{Input, Plugin, PluginError};
use crate::report::TYPE_TERMINATED;

fn handle(
    pool: &Arc<PackPool>,
    router_tx: mpsc::Sender<PackRef>,
    decoder_tx: Option<mpsc::Sender<PackRef>>,
) -> InputHandle {
    InputHandle::new(
        "test-input".to_string(),
        Arc::clone(pool),
        router_tx,
        decoder_tx,
        4,
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn inject_goes_to_the_router_without_a_decoder() {
    let pool = PackPool::new(2);
    let (router_tx, mut router_rx) = mpsc::channel(4);
    let handle = handle(&pool, router_tx, None);

    let pack = handle.new_pack().await;
    pack.state_mut().message = Message::new("evt");
    handle.inject(pack).await.unwrap();

    let routed = router_rx.recv().await.unwrap();
    assert_eq!(routed.state().message.msg_type(), "evt");
}

#[tokio::test]
async fn inject_prefers_the_configured_decoder() {
    let pool = PackPool::new(2);
    let (router_tx, mut router_rx) = mpsc::channel(4);
    let (decoder_tx, mut decoder_rx) = mpsc::channel(4);
    let handle = handle(&pool, router_tx, Some(decoder_tx));

    let pack = handle.new_pack().await;
    handle.inject(pack).await.unwrap();
    assert!(decoder_rx.recv().await.is_some());
    assert!(router_rx.try_recv().is_err());

    // The decoded path skips the decoder.
    let pack = handle.new_pack().await;
    handle.inject_decoded(pack).await.unwrap();
    assert!(router_rx.recv().await.is_some());
}

#[tokio::test]
async fn inject_enforces_the_hop_limit() {
    let pool = PackPool::new(1);
    let (router_tx, mut router_rx) = mpsc::channel(4);
    let handle = handle(&pool, router_tx, None);

    let pack = handle.new_pack().await;
    pack.state_mut().msg_loop_count = 5;
    let err = handle.inject(pack).await.unwrap_err();
    assert!(matches!(err, PipelineError::HopLimit(4)));
    assert!(router_rx.try_recv().is_err());
    // The dropped pack went back to the pool.
    assert!(pool.try_acquire().is_some());
}

struct FailingInput {
    failures: u32,
    attempts: Arc<parking_lot::Mutex<u32>>,
    restartable: bool,
}

impl Plugin for FailingInput {
    fn is_restartable(&self) -> bool {
        self.restartable
    }
}

#[async_trait]
impl Input for FailingInput {
    async fn run(&mut self, _handle: &InputHandle) -> Result<(), PluginError> {
        let mut attempts = self.attempts.lock();
        *attempts += 1;
        if *attempts <= self.failures {
            return Err(PluginError::recoverable("flaky source"));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn restartable_input_is_retried_until_it_succeeds() {
    let pool = PackPool::new(2);
    let (router_tx, _router_rx) = mpsc::channel(4);
    let attempts = Arc::new(parking_lot::Mutex::new(0));
    let plugin = FailingInput { failures: 2, attempts: Arc::clone(&attempts), restartable: true };

    let retry = weir_core::RetryOptions { delay_ms: 1, max_jitter_ms: 0, ..Default::default() };
    let runner = InputRunner::new(
        "flaky".to_string(),
        Box::new(plugin),
        retry,
        Arc::clone(&pool),
        router_tx.clone(),
    );
    runner.spawn(handle(&pool, router_tx, None)).await.unwrap();
    assert_eq!(*attempts.lock(), 3);
}

#[tokio::test]
async fn non_restartable_failure_publishes_terminated() {
    let pool = PackPool::new(2);
    let (router_tx, mut router_rx) = mpsc::channel(4);
    let attempts = Arc::new(parking_lot::Mutex::new(0));
    let plugin = FailingInput { failures: 9, attempts, restartable: false };

    let runner = InputRunner::new(
        "fragile".to_string(),
        Box::new(plugin),
        weir_core::RetryOptions::default(),
        Arc::clone(&pool),
        router_tx.clone(),
    );
    runner.spawn(handle(&pool, router_tx, None)).await.unwrap();

    let report = router_rx.recv().await.unwrap();
    let state = report.state();
    assert_eq!(state.message.msg_type(), TYPE_TERMINATED);
    assert_eq!(state.message.logger(), "fragile");
}
