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

//! Serialized access to a simulated single-connection dependency.
//!
//! A [`GuardedResource`] is constructed once per process and shared (via
//! `Arc`) with every component that talks to the constrained dependency.
//! Holders queue on a FIFO-fair [`tokio::sync::Mutex`], so every waiter is
//! eventually granted access.

use crate::context::RequestContext;
use crate::delay::Delay;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

pub struct GuardedResource {
    enabled: bool,
    lock: Mutex<()>,
    delay: Arc<dyn Delay>,
    // ticket -> request id, for every caller currently waiting or holding
    queue: DashMap<u64, String>,
    next_ticket: AtomicU64,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    acquisitions: AtomicUsize,
    held_nanos: AtomicU64,
}

impl GuardedResource {
    pub fn new(enabled: bool, delay: Arc<dyn Delay>) -> Arc<Self> {
        Arc::new(Self {
            enabled,
            lock: Mutex::new(()),
            delay,
            queue: DashMap::new(),
            next_ticket: AtomicU64::new(0),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            acquisitions: AtomicUsize::new(0),
            held_nanos: AtomicU64::new(0),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Waits for exclusive access. With serialization disabled this returns
    /// immediately and only the bookkeeping is done.
    pub async fn acquire(&self, ctx: &RequestContext) -> GuardedAccess<'_> {
        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let blockers: Vec<String> = if self.enabled {
            self.queue
                .iter()
                .map(|entry| entry.value().clone())
                .collect()
        } else {
            Vec::new()
        };
        // Registered before waiting; a cancelled waiter drops its ticket.
        let ticket = Ticket::register(&self.queue, id, ctx.request_id());

        let guard = if self.enabled {
            if !blockers.is_empty() {
                info!(
                    "{} waiting for lock behind {} transactions, blockers={:?}",
                    ctx,
                    blockers.len(),
                    blockers
                );
            }
            Some(self.lock.lock().await)
        } else {
            None
        };

        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(current, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!("{} acquired guarded resource (ticket {})", ctx, id);

        GuardedAccess {
            resource: self,
            _guard: guard,
            ticket,
            started: Instant::now(),
        }
    }

    pub fn stats(&self) -> GuardStats {
        GuardStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            peak_holders: self.peak_active.load(Ordering::SeqCst),
            queued: self.queue.len(),
            total_held: Duration::from_nanos(self.held_nanos.load(Ordering::Relaxed)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardStats {
    pub acquisitions: usize,
    /// Highest number of simultaneous holders ever observed.
    pub peak_holders: usize,
    /// Callers currently waiting or holding.
    pub queued: usize,
    pub total_held: Duration,
}

/// Exclusive access to the guarded resource; released on drop.
pub struct GuardedAccess<'a> {
    resource: &'a GuardedResource,
    _guard: Option<MutexGuard<'a, ()>>,
    ticket: Ticket<'a>,
    started: Instant,
}

/// A caller's entry in the waiter table, removed when dropped.
struct Ticket<'a> {
    queue: &'a DashMap<u64, String>,
    id: u64,
}

impl<'a> Ticket<'a> {
    fn register(queue: &'a DashMap<u64, String>, id: u64, request_id: &str) -> Self {
        queue.insert(id, request_id.to_string());
        Self { queue, id }
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.queue.remove(&self.id);
    }
}

impl GuardedAccess<'_> {
    /// Sleeps for the configured simulated latency while holding access.
    pub async fn inject_latency(&self) {
        let delay = self.resource.delay.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn release(self) {}
}

impl Drop for GuardedAccess<'_> {
    fn drop(&mut self) {
        let held = self.started.elapsed();
        self.resource
            .held_nanos
            .fetch_add(held.as_nanos() as u64, Ordering::Relaxed);
        self.resource.active.fetch_sub(1, Ordering::SeqCst);
        debug!(
            "released guarded resource (ticket {}) after {:?}",
            self.ticket.id, held
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::FixedDelay;

    fn resource(enabled: bool, delay: Duration) -> Arc<GuardedResource> {
        GuardedResource::new(enabled, Arc::new(FixedDelay(delay)))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn admits_one_holder_at_a_time() {
        let guarded = resource(true, Duration::from_millis(5));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let guarded = guarded.clone();
                tokio::spawn(async move {
                    let ctx = RequestContext::new(format!("r{i}"));
                    let access = guarded.acquire(&ctx).await;
                    access.inject_latency().await;
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let stats = guarded.stats();
        assert_eq!(stats.acquisitions, 8);
        assert_eq!(stats.peak_holders, 1);
        assert_eq!(stats.queued, 0);
        assert!(stats.total_held >= Duration::from_millis(5 * 8));
    }

    #[tokio::test(start_paused = true)]
    async fn contended_callers_take_turns() {
        let guarded = resource(true, Duration::from_millis(100));
        let start = Instant::now();
        let tasks = (0..3).map(|i| {
            let guarded = guarded.clone();
            async move {
                let access = guarded.acquire(&RequestContext::new(format!("r{i}"))).await;
                access.inject_latency().await;
            }
        });
        run_all(tasks).await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_guard_lets_callers_overlap() {
        let guarded = resource(false, Duration::from_millis(100));
        let start = Instant::now();
        let tasks = (0..3).map(|i| {
            let guarded = guarded.clone();
            async move {
                let access = guarded.acquire(&RequestContext::new(format!("r{i}"))).await;
                access.inject_latency().await;
            }
        });
        run_all(tasks).await;
        assert!(start.elapsed() < Duration::from_millis(200));
        assert_eq!(guarded.stats().peak_holders, 3);
    }

    #[tokio::test]
    async fn release_frees_for_next_caller() {
        let guarded = resource(true, Duration::ZERO);
        let ctx = RequestContext::new("r1");
        let first = guarded.acquire(&ctx).await;
        assert_eq!(guarded.stats().queued, 1);
        first.release();
        let _second = guarded.acquire(&ctx).await;
        assert_eq!(guarded.stats().acquisitions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_waiter_leaves_the_queue() {
        let guarded = resource(true, Duration::ZERO);
        let holder = guarded.acquire(&RequestContext::new("holder")).await;

        let waiter = RequestContext::new("abandoned");
        let waited =
            tokio::time::timeout(Duration::from_millis(10), guarded.acquire(&waiter)).await;
        assert!(waited.is_err());
        assert_eq!(guarded.stats().queued, 1);

        drop(holder);
        let next = guarded.acquire(&RequestContext::new("next")).await;
        assert_eq!(guarded.stats().queued, 1);
        drop(next);

        let stats = guarded.stats();
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.acquisitions, 2);
    }

    async fn run_all<F>(tasks: impl Iterator<Item = F>)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut set = tokio::task::JoinSet::new();
        for t in tasks {
            set.spawn(t);
        }
        while let Some(res) = set.join_next().await {
            res.unwrap();
        }
    }
}
