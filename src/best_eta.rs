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

//! Best-ETA dispatch: fan one routing task per candidate driver out over the
//! worker pool, wait for every outcome, and keep the fastest driver.

use crate::config::Config;
use crate::constants::CUSTOMER_BAGGAGE_KEY;
use crate::context::RequestContext;
use crate::customer::{Customer, CustomerDatabase, CustomerSource};
use crate::delay::NormalDelay;
use crate::driver::{Driver, DriverLocator};
use crate::error::{EtaError, Result};
use crate::guarded::GuardedResource;
use crate::route::{Route, RouteFinder};
use crate::worker_pool::WorkerPool;
use anyhow::anyhow;
use log::{debug, info};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    pub driver: String,
    pub eta: Duration,
}

/// Outcome of routing one candidate driver to the customer.
#[derive(Debug)]
pub struct RouteResult {
    pub driver_id: String,
    pub outcome: anyhow::Result<Route>,
}

pub struct BestEta {
    customers: Arc<dyn CustomerSource>,
    drivers: Arc<dyn DriverLocator>,
    routes: Arc<dyn RouteFinder>,
    pool: Arc<WorkerPool>,
}

impl BestEta {
    pub fn new(
        customers: Arc<dyn CustomerSource>,
        drivers: Arc<dyn DriverLocator>,
        routes: Arc<dyn RouteFinder>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            customers,
            drivers,
            routes,
            pool,
        }
    }

    /// Wires the stock customer database and a route pool from `config`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(
        config: &Config,
        drivers: Arc<dyn DriverLocator>,
        routes: Arc<dyn RouteFinder>,
    ) -> Result<Self> {
        config.validate()?;
        let guard = GuardedResource::new(
            config.guard_enabled,
            Arc::new(NormalDelay::new(
                config.lookup_delay,
                config.lookup_delay_std_dev,
            )),
        );
        let customers = Arc::new(CustomerDatabase::new(guard));
        let pool = WorkerPool::new(config.worker_pool_size)?;
        Ok(Self::new(customers, drivers, routes, pool))
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub async fn get(&self, ctx: &RequestContext, customer_id: u64) -> Result<Response> {
        let customer = self.customers.get(ctx, customer_id).await?;
        info!("{} found customer {:?}", ctx, customer);

        let ctx = ctx
            .clone()
            .with_baggage(CUSTOMER_BAGGAGE_KEY, customer.name.as_str());

        let drivers = self.drivers.find_nearest(&ctx, &customer.location).await?;
        info!("{} found drivers {:?}", ctx, drivers);

        let results = self.get_routes(&ctx, &customer, drivers).await?;
        info!("{} found routes {:?}", ctx, results);

        let resp = reduce(results)?;
        info!(
            "{} dispatch successful driver={} eta={:?}",
            ctx, resp.driver, resp.eta
        );
        Ok(resp)
    }

    /// Routes every driver to the customer on the pool and waits for all of them.
    async fn get_routes(
        &self,
        ctx: &RequestContext,
        customer: &Customer,
        drivers: Vec<Driver>,
    ) -> Result<Vec<RouteResult>> {
        let collector = Arc::new(RouteCollector::new(drivers.len()));
        let mut submit_error = None;

        for driver in drivers {
            let task = RouteTask {
                ctx: ctx.clone(),
                pickup: driver.location,
                dropoff: customer.location.clone(),
                sink: ResultSink::new(collector.clone(), driver.driver_id),
            };
            let routes = self.routes.clone();
            // A rejected task is dropped here and its sink still reports in.
            if let Err(e) = self.pool.submit(move || task.run(routes)) {
                submit_error.get_or_insert(e);
            }
        }

        collector.wait().await;
        if let Some(e) = submit_error {
            return Err(e);
        }
        Ok(collector.take())
    }
}

/// Picks the fastest route. Any failed outcome fails the whole dispatch,
/// first one in collection order wins; ties keep the earliest result.
pub fn reduce(results: Vec<RouteResult>) -> Result<Response> {
    let mut best: Option<Response> = None;
    for result in results {
        let route = result.outcome?;
        if best.as_ref().is_none_or(|b| route.eta < b.eta) {
            best = Some(Response {
                driver: result.driver_id,
                eta: route.eta,
            });
        }
    }
    best.ok_or(EtaError::NoRouteFound)
}

/// One driver's routing job, owned outright by the worker that runs it.
struct RouteTask {
    ctx: RequestContext,
    pickup: String,
    dropoff: String,
    sink: ResultSink,
}

impl RouteTask {
    async fn run(self, routes: Arc<dyn RouteFinder>) {
        let span = tracing::info_span!(
            "find_route",
            driver = %self.sink.driver_id,
            pickup = %self.pickup,
            dropoff = %self.dropoff,
        );
        let outcome = routes
            .find_route(&self.ctx, &self.pickup, &self.dropoff)
            .instrument(span)
            .await;
        self.sink.deliver(outcome);
    }
}

/// Shared accumulator plus the count of tasks still outstanding.
struct RouteCollector {
    results: Mutex<Vec<RouteResult>>,
    remaining: AtomicUsize,
    done: Notify,
}

impl RouteCollector {
    fn new(expected: usize) -> Self {
        Self {
            results: Mutex::new(Vec::with_capacity(expected)),
            remaining: AtomicUsize::new(expected),
            done: Notify::new(),
        }
    }

    fn push(&self, result: RouteResult) {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.done.notify_waiters();
        }
    }

    async fn wait(&self) {
        loop {
            // Registered before the check so a concurrent final push is not missed.
            let notified = self.done.notified();
            if self.remaining.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn take(&self) -> Vec<RouteResult> {
        std::mem::take(&mut *self.results.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Reports exactly one result per driver, from `deliver` or, if the task is
/// dropped or panics first, from `Drop`.
struct ResultSink {
    collector: Arc<RouteCollector>,
    driver_id: String,
    outcome: Option<anyhow::Result<Route>>,
}

impl ResultSink {
    fn new(collector: Arc<RouteCollector>, driver_id: String) -> Self {
        Self {
            collector,
            driver_id,
            outcome: None,
        }
    }

    fn deliver(mut self, outcome: anyhow::Result<Route>) {
        self.outcome = Some(outcome);
    }
}

impl Drop for ResultSink {
    fn drop(&mut self) {
        let driver_id = std::mem::take(&mut self.driver_id);
        let outcome = self.outcome.take().unwrap_or_else(|| {
            debug!("route task for driver {} ended without a result", driver_id);
            Err(anyhow!("route task for driver {driver_id} did not complete"))
        });
        self.collector.push(RouteResult { driver_id, outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(driver: &str, minutes: u64) -> RouteResult {
        RouteResult {
            driver_id: driver.to_string(),
            outcome: Ok(Route {
                pickup: String::new(),
                dropoff: String::new(),
                eta: Duration::from_secs(minutes * 60),
            }),
        }
    }

    fn failed(driver: &str, msg: &str) -> RouteResult {
        RouteResult {
            driver_id: driver.to_string(),
            outcome: Err(anyhow!(msg.to_string())),
        }
    }

    #[test]
    fn reduce_picks_minimum() {
        let resp = reduce(vec![ok("D1", 12), ok("D2", 3), ok("D3", 7)]).unwrap();
        assert_eq!(resp.driver, "D2");
        assert_eq!(resp.eta, Duration::from_secs(180));
    }

    #[test]
    fn reduce_tie_keeps_first_seen() {
        let resp = reduce(vec![ok("D9", 5), ok("D1", 5), ok("D4", 8)]).unwrap();
        assert_eq!(resp.driver, "D9");
    }

    #[test]
    fn reduce_zero_eta_is_a_real_answer() {
        let resp = reduce(vec![ok("D1", 4), ok("D2", 0)]).unwrap();
        assert_eq!(resp.driver, "D2");
        assert_eq!(resp.eta, Duration::ZERO);
    }

    #[test]
    fn reduce_first_error_wins() {
        let err = reduce(vec![ok("D1", 1), failed("D2", "first"), failed("D3", "second")])
            .unwrap_err();
        assert_eq!(err.to_string(), "upstream error: first");
    }

    #[test]
    fn reduce_empty_is_no_route() {
        assert!(matches!(reduce(vec![]), Err(EtaError::NoRouteFound)));
    }

    #[tokio::test]
    async fn dropped_sink_still_reports() {
        let collector = Arc::new(RouteCollector::new(2));
        ResultSink::new(collector.clone(), "D1".into()).deliver(Ok(Route {
            pickup: "1,1".into(),
            dropoff: "2,2".into(),
            eta: Duration::from_secs(60),
        }));
        drop(ResultSink::new(collector.clone(), "D2".into()));

        collector.wait().await;
        let results = collector.take();
        assert_eq!(results.len(), 2);
        assert!(results[0].outcome.is_ok());
        assert_eq!(results[1].driver_id, "D2");
        assert!(results[1].outcome.is_err());
    }

    #[tokio::test]
    async fn collector_with_nothing_expected_does_not_wait() {
        let collector = RouteCollector::new(0);
        collector.wait().await;
        assert!(collector.take().is_empty());
    }
}
