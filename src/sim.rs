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

//! In-process stand-ins for the driver and route services, for demos and tests.

use crate::BoxFuture;
use crate::context::RequestContext;
use crate::delay::{Delay, FixedDelay};
use crate::driver::{Driver, DriverLocator};
use crate::route::{Route, RouteFinder};
use anyhow::{Context, anyhow};
use log::debug;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Parses an `"x,y"` coordinate pair.
pub fn parse_location(location: &str) -> anyhow::Result<(i64, i64)> {
    let (x, y) = location
        .split_once(',')
        .ok_or_else(|| anyhow!("malformed location {location:?}"))?;
    let x = x.trim().parse().with_context(|| format!("bad x in {location:?}"))?;
    let y = y.trim().parse().with_context(|| format!("bad y in {location:?}"))?;
    Ok((x, y))
}

/// Always returns the same candidate list.
pub struct StaticDriverLocator {
    drivers: Vec<Driver>,
}

impl StaticDriverLocator {
    pub fn new(drivers: Vec<Driver>) -> Self {
        Self { drivers }
    }
}

impl DriverLocator for StaticDriverLocator {
    fn find_nearest<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _location: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Vec<Driver>>> {
        Box::pin(async move { Ok(self.drivers.clone()) })
    }
}

/// Scatters `count` drivers within `radius` of the requested location.
pub struct RandomDriverLocator {
    count: usize,
    radius: i64,
}

impl RandomDriverLocator {
    pub fn new(count: usize, radius: i64) -> Self {
        Self { count, radius }
    }
}

impl DriverLocator for RandomDriverLocator {
    fn find_nearest<'a>(
        &'a self,
        ctx: &'a RequestContext,
        location: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Vec<Driver>>> {
        Box::pin(async move {
            let (x, y) = parse_location(location)?;
            let mut rng = rand::thread_rng();
            let drivers: Vec<Driver> = (0..self.count)
                .map(|_| {
                    let id = format!("T7{:05}C", rng.gen_range(0..100_000));
                    let dx = rng.gen_range(-self.radius..=self.radius);
                    let dy = rng.gen_range(-self.radius..=self.radius);
                    Driver::new(id, format!("{},{}", x + dx, y + dy))
                })
                .collect();
            debug!("{} located {} drivers near {}", ctx, drivers.len(), location);
            Ok(drivers)
        })
    }
}

/// ETA proportional to the manhattan distance between the two points.
pub struct DistanceRouteFinder {
    per_unit: Duration,
    delay: Arc<dyn Delay>,
}

impl DistanceRouteFinder {
    pub fn new(per_unit: Duration) -> Self {
        Self {
            per_unit,
            delay: Arc::new(FixedDelay::default()),
        }
    }

    /// Adds simulated latency to every route computation.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }
}

impl RouteFinder for DistanceRouteFinder {
    fn find_route<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        pickup: &'a str,
        dropoff: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Route>> {
        Box::pin(async move {
            let (px, py) = parse_location(pickup)?;
            let (dx, dy) = parse_location(dropoff)?;
            let delay = self.delay.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let distance = (px - dx).unsigned_abs() + (py - dy).unsigned_abs();
            let units = u32::try_from(distance).context("route too long")?;
            Ok(Route {
                pickup: pickup.to_string(),
                dropoff: dropoff.to_string(),
                eta: self.per_unit * units,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        assert_eq!(parse_location("115,277").unwrap(), (115, 277));
        assert_eq!(parse_location(" -3, 4").unwrap(), (-3, 4));
        assert!(parse_location("115").is_err());
        assert!(parse_location("a,1").is_err());
    }

    #[tokio::test]
    async fn distance_route_eta() {
        let finder = DistanceRouteFinder::new(Duration::from_secs(60));
        let ctx = RequestContext::new("r1");
        let route = finder.find_route(&ctx, "116,277", "115,277").await.unwrap();
        assert_eq!(route.eta, Duration::from_secs(60));
        let route = finder.find_route(&ctx, "500,500", "115,277").await.unwrap();
        assert_eq!(route.eta, Duration::from_secs(60 * (385 + 223)));
    }

    #[tokio::test]
    async fn random_drivers_stay_in_radius() {
        let locator = RandomDriverLocator::new(10, 5);
        let drivers = locator
            .find_nearest(&RequestContext::new("r1"), "100,100")
            .await
            .unwrap();
        assert_eq!(drivers.len(), 10);
        for d in drivers {
            let (x, y) = parse_location(&d.location).unwrap();
            assert!((95..=105).contains(&x) && (95..=105).contains(&y));
            assert!(d.driver_id.starts_with("T7"));
        }
    }
}
