// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use weir_core::FakeClock;

#[test]
fn sampling_is_periodic_not_per_call() {
    let clock = FakeClock::new();
    let mut sampler = DurationSampler::new(clock.clone(), 0);

    // The countdown is drawn from [0, 1000), so 1000 calls guarantee
    // at least one timed sample without timing all of them.
    for _ in 0..1000 {
        sampler.measure(|| clock.advance(Duration::from_millis(1)));
    }
    let (accumulated, samples) = sampler.snapshot();
    assert!(samples >= 1);
    assert!(samples < 1000);
    assert_eq!(accumulated, Duration::from_millis(samples as u64));
}

#[test]
fn untimed_calls_still_run_the_closure() {
    let clock = FakeClock::new();
    let mut sampler = DurationSampler::new(clock, 5000);
    let mut ran = 0;
    for _ in 0..10 {
        sampler.measure(|| ran += 1);
    }
    assert_eq!(ran, 10);
    // Countdown of at least 5000 means none of the ten were timed.
    assert_eq!(sampler.snapshot().1, 0);
}

#[test]
fn measure_returns_the_closure_value() {
    let clock = FakeClock::new();
    let mut sampler = DurationSampler::new(clock, 0);
    let value = sampler.measure(|| 41 + 1);
    assert_eq!(value, 42);
}
