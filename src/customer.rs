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
use crate::error::{EtaError, Result};
use crate::guarded::GuardedResource;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Coordinate pair, `"x,y"`.
    pub location: String,
}

impl Customer {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
        }
    }
}

pub trait CustomerSource: Send + Sync {
    fn get<'a>(
        &'a self,
        ctx: &'a RequestContext,
        customer_id: u64,
    ) -> BoxFuture<'a, Result<Customer>>;
}

/// Read-only customer table behind a single simulated connection.
pub struct CustomerDatabase {
    customers: HashMap<u64, Customer>,
    guard: Arc<GuardedResource>,
}

impl CustomerDatabase {
    /// Database seeded with the stock customer records.
    pub fn new(guard: Arc<GuardedResource>) -> Self {
        Self::with_customers(
            guard,
            [
                (123, Customer::new("123", "Rachel's_Floral_Designs", "115,277")),
                (567, Customer::new("567", "Amazing_Coffee_Roasters", "211,653")),
                (392, Customer::new("392", "Trom_Chocolatier", "577,322")),
                (731, Customer::new("731", "Japanese_Desserts", "728,326")),
            ],
        )
    }

    pub fn with_customers(
        guard: Arc<GuardedResource>,
        customers: impl IntoIterator<Item = (u64, Customer)>,
    ) -> Self {
        Self {
            customers: customers.into_iter().collect(),
            guard,
        }
    }

    async fn select(&self, ctx: &RequestContext, customer_id: u64) -> Result<Customer> {
        let access = self.guard.acquire(ctx).await;
        access.inject_latency().await;
        // access drops on both arms
        self.customers
            .get(&customer_id)
            .cloned()
            .ok_or(EtaError::NotFound { customer_id })
    }
}

impl CustomerSource for CustomerDatabase {
    fn get<'a>(
        &'a self,
        ctx: &'a RequestContext,
        customer_id: u64,
    ) -> BoxFuture<'a, Result<Customer>> {
        info!("{} loading customer customer_id={}", ctx, customer_id);
        let span = tracing::info_span!(
            "SQL SELECT",
            peer.service = "mysql",
            sql.query = %format!("SELECT * FROM customer WHERE customer_id={customer_id}"),
        );
        Box::pin(self.select(ctx, customer_id).instrument(span))
    }
}
