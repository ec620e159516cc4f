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

//! # Best-ETA Dispatcher
//!
//! Finds the driver that can reach a customer soonest by routing every
//! candidate driver concurrently on a bounded [`tokio`] worker pool.
//!
//! - **Guarded resource**: a process-wide, single-holder lock with injected
//!   latency that models a connection-starved customer store
//! - **Worker pool**: a fixed number of workers draining one unbounded queue
//! - **Fan-out/fan-in**: one routing task per driver, every outcome collected
//!   before the fastest route is picked
//!
//! ## Core Concepts
//!
//! - [`CustomerSource`], [`DriverLocator`] and [`RouteFinder`] are the seams to
//!   the outside services; [`sim`] has in-process implementations.
//! - [`GuardedResource`] is built once and shared with whatever needs it.
//! - [`BestEta::get`] resolves the customer, the nearby drivers and their
//!   routes, and returns a [`Response`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use best_eta_dispatcher::sim::{DistanceRouteFinder, RandomDriverLocator};
//! use best_eta_dispatcher::{BestEta, Config, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let best_eta = BestEta::from_config(
//!         &config,
//!         Arc::new(RandomDriverLocator::new(10, 50)),
//!         Arc::new(DistanceRouteFinder::new(Duration::from_secs(5))),
//!     )?;
//!
//!     let resp = best_eta.get(&RequestContext::generate(), 123).await?;
//!     println!("driver {} arrives in {:?}", resp.driver, resp.eta);
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! - No cancellation or deadline: a dispatched routing task always runs to
//!   completion.
//! - When several routes fail, which error is reported depends on
//!   completion order.

use std::future::Future;
use std::pin::Pin;

pub mod best_eta;
pub mod config;
mod constants;
pub mod context;
pub mod customer;
pub mod delay;
pub mod driver;
pub mod error;
pub mod guarded;
pub mod route;
pub mod sim;
pub mod worker_pool;

pub use best_eta::{BestEta, Response, RouteResult};
pub use config::Config;
pub use context::RequestContext;
pub use customer::{Customer, CustomerDatabase, CustomerSource};
pub use driver::{Driver, DriverLocator};
pub use error::{EtaError, Result};
pub use guarded::GuardedResource;
pub use route::{Route, RouteFinder};
pub use worker_pool::WorkerPool;

/// Boxed, sendable future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
