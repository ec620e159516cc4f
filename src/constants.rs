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

pub const DEFAULT_WORKER_POOL_SIZE: usize = 3;
pub const DEFAULT_LOOKUP_DELAY_MS: u64 = 300;
pub const DEFAULT_LOOKUP_DELAY_STDDEV_MS: u64 = 30;

pub const ENV_WORKER_POOL_SIZE: &str = "BEST_ETA_WORKER_POOL_SIZE";
pub const ENV_GUARD_DISABLED: &str = "BEST_ETA_GUARD_DISABLED";
pub const ENV_LOOKUP_DELAY_MS: &str = "BEST_ETA_LOOKUP_DELAY_MS";
pub const ENV_LOOKUP_DELAY_STDDEV_MS: &str = "BEST_ETA_LOOKUP_DELAY_STDDEV_MS";

/// Baggage key under which the session-level request id travels.
pub const REQUEST_BAGGAGE_KEY: &str = "request";
/// Baggage key holding the resolved customer's name.
pub const CUSTOMER_BAGGAGE_KEY: &str = "customer";
