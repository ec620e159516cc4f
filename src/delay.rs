// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Injected latency for simulated downstream calls.

use rand_distr::{Distribution, Normal};
use std::time::Duration;

/// Source of simulated latencies.
pub trait Delay: Send + Sync {
    fn next_delay(&self) -> Duration;
}

/// Normally distributed latency; negative draws clamp to zero.
#[derive(Clone, Debug)]
pub struct NormalDelay {
    mean: Duration,
    std_dev: Duration,
}

impl NormalDelay {
    pub fn new(mean: Duration, std_dev: Duration) -> Self {
        Self { mean, std_dev }
    }
}

impl Delay for NormalDelay {
    fn next_delay(&self) -> Duration {
        if self.std_dev.is_zero() {
            return self.mean;
        }
        match Normal::new(self.mean.as_secs_f64(), self.std_dev.as_secs_f64()) {
            Ok(normal) => {
                let secs = normal.sample(&mut rand::thread_rng());
                Duration::from_secs_f64(secs.max(0.0))
            }
            Err(_) => self.mean,
        }
    }
}

/// Always the same latency. `FixedDelay::default()` injects none.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedDelay(pub Duration);

impl Delay for FixedDelay {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
