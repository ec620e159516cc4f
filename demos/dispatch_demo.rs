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

//! Dispatches a burst of concurrent requests against the simulated services.
//!
//! ```text
//! RUST_LOG=debug cargo run --example dispatch_demo
//! BEST_ETA_GUARD_DISABLED=true cargo run --example dispatch_demo
//! ```

use best_eta_dispatcher::delay::NormalDelay;
use best_eta_dispatcher::sim::{DistanceRouteFinder, RandomDriverLocator};
use best_eta_dispatcher::{BestEta, Config, RequestContext};
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = Config::from_env()?;
    info!("config: {:?}", config);

    let routes = DistanceRouteFinder::new(Duration::from_secs(5)).with_delay(Arc::new(
        NormalDelay::new(Duration::from_millis(50), Duration::from_millis(25)),
    ));
    let best_eta = Arc::new(BestEta::from_config(
        &config,
        Arc::new(RandomDriverLocator::new(10, 50)),
        Arc::new(routes),
    )?);

    let start = Instant::now();
    let mut set = tokio::task::JoinSet::new();
    for customer_id in [123, 567, 392, 731, 999] {
        let best_eta = best_eta.clone();
        set.spawn(async move {
            let ctx = RequestContext::generate();
            (customer_id, best_eta.get(&ctx, customer_id).await)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined? {
            (id, Ok(resp)) => info!("customer {}: driver {} eta {:?}", id, resp.driver, resp.eta),
            (id, Err(e)) => error!("customer {}: {}", id, e),
        }
    }
    info!("all requests done in {:?}", start.elapsed());

    best_eta.pool().shutdown().await;
    info!(
        "worker metrics: {}",
        serde_json::to_string(&best_eta.pool().worker_metrics())?
    );
    Ok(())
}
