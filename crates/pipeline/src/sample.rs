// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic duration sampling.
//!
//! Timing every evaluation would cost more than the evaluations; a
//! countdown drawn from `[denominator, denominator + 1000)` decides
//! which ones get the monotonic clock treatment.

use std::time::Duration;

use rand::Rng;
use weir_core::Clock;

pub struct DurationSampler<C: Clock> {
    clock: C,
    denominator: u64,
    countdown: u64,
    accumulated: Duration,
    samples: u64,
}

impl<C: Clock> DurationSampler<C> {
    pub fn new(clock: C, denominator: u64) -> Self {
        let mut sampler = Self {
            clock,
            denominator,
            countdown: 0,
            accumulated: Duration::ZERO,
            samples: 0,
        };
        sampler.draw();
        sampler
    }

    /// Runs `f`, timing it when the countdown has expired.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        if self.countdown == 0 {
            let start = self.clock.now();
            let out = f();
            self.accumulated += self.clock.now() - start;
            self.samples += 1;
            self.draw();
            out
        } else {
            self.countdown -= 1;
            f()
        }
    }

    /// Accumulated sampled duration and sample count.
    pub fn snapshot(&self) -> (Duration, u64) {
        (self.accumulated, self.samples)
    }

    fn draw(&mut self) {
        self.countdown = rand::thread_rng().gen_range(self.denominator..self.denominator + 1000);
    }
}

#[cfg(test)]
#[path = "sample_tests.rs"]
mod tests;
