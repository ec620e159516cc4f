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

use crate::constants::{CUSTOMER_BAGGAGE_KEY, REQUEST_BAGGAGE_KEY};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

/// Request-scoped context carried through every stage of a dispatch.
///
/// Holds string baggage only; it is cheap to clone into each routing task.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    baggage: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self::default().with_baggage(REQUEST_BAGGAGE_KEY, request_id)
    }

    /// Context with a fresh process-unique request id.
    pub fn generate() -> Self {
        let n = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("req-{n}"))
    }

    pub fn with_baggage(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.baggage.insert(key.into(), value.into());
        self
    }

    pub fn baggage(&self, key: &str) -> Option<&str> {
        self.baggage.get(key).map(String::as_str)
    }

    pub fn request_id(&self) -> &str {
        self.baggage(REQUEST_BAGGAGE_KEY).unwrap_or("-")
    }

    pub fn customer(&self) -> Option<&str> {
        self.baggage(CUSTOMER_BAGGAGE_KEY)
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request={}", self.request_id())?;
        if let Some(customer) = self.customer() {
            write!(f, " customer={customer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_customer_once_attached() {
        let ctx = RequestContext::new("r1");
        assert_eq!(ctx.to_string(), "request=r1");
        let ctx = ctx.with_baggage(CUSTOMER_BAGGAGE_KEY, "Trom_Chocolatier");
        assert_eq!(ctx.to_string(), "request=r1 customer=Trom_Chocolatier");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = RequestContext::generate();
        let b = RequestContext::generate();
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn missing_request_id_renders_placeholder() {
        assert_eq!(RequestContext::default().request_id(), "-");
    }
}
