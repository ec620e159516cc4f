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

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: String,
    /// Coordinate pair, `"x,y"`.
    pub location: String,
}

impl Driver {
    pub fn new(driver_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            driver_id: driver_id.into(),
            location: location.into(),
        }
    }
}

/// Finds candidate drivers close to a location.
pub trait DriverLocator: Send + Sync {
    fn find_nearest<'a>(
        &'a self,
        ctx: &'a RequestContext,
        location: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Vec<Driver>>>;
}
