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

use crate::BoxFuture;
use crate::context::RequestContext;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub pickup: String,
    pub dropoff: String,
    pub eta: Duration,
}

/// Computes a route between two coordinate pairs.
///
/// Implementations are shared across route workers, hence `'static`.
pub trait RouteFinder: Send + Sync + 'static {
    fn find_route<'a>(
        &'a self,
        ctx: &'a RequestContext,
        pickup: &'a str,
        dropoff: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Route>>;
}
