// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pack::PackOrigin;

#[tokio::test]
async fn acquire_returns_zeroed_pack_with_one_reference() {
    let pool = PackPool::new(2);
    let pack = pool.acquire().await;
    assert_eq!(pack.ref_count(), 1);
    assert_eq!(pack.origin(), PackOrigin::Input);
    assert!(pack.state().msg_bytes.is_empty());
}

#[tokio::test]
async fn inject_packs_return_to_inject_channel() {
    let pool = PackPool::new(1);
    let pack = pool.acquire_inject().await;
    assert_eq!(pack.origin(), PackOrigin::Inject);
    pool.release(pack);
    // The channel was refilled: a second acquire completes immediately.
    let again = pool.acquire_inject().await;
    assert_eq!(again.origin(), PackOrigin::Inject);
}

#[tokio::test]
async fn retain_release_balance_recycles_once() {
    let pool = PackPool::new(1);
    let pack = pool.acquire().await;

    // Fan out to three consumers: retain three times, then each side
    // releases exactly once (router + three destinations = four total).
    pool.retain(&pack);
    pool.retain(&pack);
    pool.retain(&pack);
    assert_eq!(pack.ref_count(), 4);

    pool.release(pack.clone());
    pool.release(pack.clone());
    pool.release(pack.clone());
    assert_eq!(pack.ref_count(), 1);
    assert!(pool.try_acquire().is_none());

    pool.release(pack);
    assert!(pool.try_acquire().is_some());
}

#[tokio::test]
async fn release_resets_before_recycling() {
    let pool = PackPool::new(1);
    let pack = pool.acquire().await;
    pack.state_mut().msg_loop_count = 2;
    pack.state_mut().signer = "s".to_string();
    pool.release(pack);

    let recycled = pool.acquire().await;
    let state = recycled.state();
    assert_eq!(state.msg_loop_count, 0);
    assert!(state.signer.is_empty());
}

#[tokio::test]
async fn pool_is_bounded() {
    let pool = PackPool::new(2);
    let a = pool.acquire().await;
    let _b = pool.acquire().await;
    assert!(pool.try_acquire().is_none());
    pool.release(a);
    assert!(pool.try_acquire().is_some());
}
