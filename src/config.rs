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

//! Runtime options for the dispatcher.
//!
//! Defaults mirror a deliberately misconfigured deployment: a single-connection
//! customer store with ~300ms lookups and a small route worker pool.

use crate::constants::*;
use crate::error::{EtaError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of route workers; must be at least 1.
    pub worker_pool_size: usize,
    /// When false, customer lookups bypass the guarded resource entirely.
    pub guard_enabled: bool,
    /// Mean injected latency for a guarded lookup.
    pub lookup_delay: Duration,
    pub lookup_delay_std_dev: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            guard_enabled: true,
            lookup_delay: Duration::from_millis(DEFAULT_LOOKUP_DELAY_MS),
            lookup_delay_std_dev: Duration::from_millis(DEFAULT_LOOKUP_DELAY_STDDEV_MS),
        }
    }
}

impl Config {
    /// Defaults overridden by any `BEST_ETA_*` variables present in the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_WORKER_POOL_SIZE) {
            config.worker_pool_size = parse(ENV_WORKER_POOL_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_GUARD_DISABLED) {
            config.guard_enabled = !parse::<bool>(ENV_GUARD_DISABLED, &v)?;
        }
        if let Some(v) = lookup(ENV_LOOKUP_DELAY_MS) {
            config.lookup_delay = Duration::from_millis(parse(ENV_LOOKUP_DELAY_MS, &v)?);
        }
        if let Some(v) = lookup(ENV_LOOKUP_DELAY_STDDEV_MS) {
            config.lookup_delay_std_dev =
                Duration::from_millis(parse(ENV_LOOKUP_DELAY_STDDEV_MS, &v)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(EtaError::InvalidConfig(
                "worker_pool_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EtaError::InvalidConfig(format!("{key}: cannot parse {value:?}")))
}
