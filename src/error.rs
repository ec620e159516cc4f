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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtaError>;

#[derive(Error, Debug)]
pub enum EtaError {
    #[error("invalid customer ID: {customer_id}")]
    NotFound { customer_id: u64 },

    #[error("no routes found")]
    NoRouteFound,

    /// Failure reported by the nearest-drivers or routing collaborator.
    #[error("upstream error: {0:#}")]
    Upstream(#[from] anyhow::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker pool is shut down")]
    PoolClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_keeps_source_message() {
        let err = EtaError::from(anyhow::anyhow!("redis timeout"));
        assert_eq!(err.to_string(), "upstream error: redis timeout");
    }

    #[test]
    fn not_found_names_customer() {
        let err = EtaError::NotFound { customer_id: 999 };
        assert_eq!(err.to_string(), "invalid customer ID: 999");
    }
}
