//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Bounded slot pool
//!
//! A [`SlotPool`] owns a fixed number of slots. The listener reserves one per
//! accepted client with [`SlotPool::acquire`], which waits while every slot is
//! busy, and the returned [`SlotGuard`] gives the slot back when it drops.
//!
//! All slot bookkeeping happens under a single mutex. Waiters are woken through
//! [`tokio::sync::Notify`]: one permit per release, so each freed slot wakes at
//! most one blocked acquirer.

use crate::{ConnectionId, Result, ServiceError, SlotId};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    connection: Option<ConnectionId>,
    in_use: bool,
}

#[derive(Debug)]
struct PoolState {
    slots: Vec<Slot>,
    active: usize,
}

#[derive(Debug)]
struct PoolInner {
    state: Mutex<PoolState>,
    available: Notify,
    drained: Notify,
}

/// Fixed-capacity pool of session slots
///
/// Cloning is cheap and every clone refers to the same pool.
#[derive(Clone)]
pub struct SlotPool {
    inner: Arc<PoolInner>,
}

impl SlotPool {
    /// Create a pool with `capacity` free slots
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ServiceError::InvalidConfig(
                "slot pool capacity must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    slots: vec![Slot::default(); capacity],
                    active: 0,
                }),
                available: Notify::new(),
                drained: Notify::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot for `connection`, waiting until one is free
    ///
    /// Cancel safe: dropping the future before it resolves reserves nothing.
    pub async fn acquire(&self, connection: ConnectionId) -> SlotGuard {
        loop {
            // Register interest before checking so a release between the
            // check and the await is not lost.
            let notified = self.inner.available.notified();
            if let Some(guard) = self.try_acquire(connection) {
                return guard;
            }
            tracing::trace!(connection_id = %connection, "Slot pool saturated, waiting");
            notified.await;
        }
    }

    /// Reserve a slot for `connection` if one is free right now
    pub fn try_acquire(&self, connection: ConnectionId) -> Option<SlotGuard> {
        let mut state = self.lock();
        if state.active >= state.slots.len() {
            return None;
        }
        let index = state.slots.iter().position(|slot| !slot.in_use)?;
        state.slots[index] = Slot {
            connection: Some(connection),
            in_use: true,
        };
        state.active += 1;
        let free = state.slots.len() - state.active;
        drop(state);

        // A stored permit may have been consumed by a waiter that lost the race
        // to this caller; pass the wake-up on while slots remain.
        if free > 0 {
            self.inner.available.notify_one();
        }

        Some(SlotGuard {
            pool: self.clone(),
            slot: SlotId::new(index),
            connection,
        })
    }

    fn release(&self, slot: SlotId, connection: ConnectionId) {
        let mut state = self.lock();
        let Some(entry) = state.slots.get_mut(slot.index()) else {
            tracing::error!(%slot, "Release of a slot outside the pool");
            debug_assert!(false, "release of {slot} outside the pool");
            return;
        };
        if !entry.in_use {
            tracing::error!(%slot, connection_id = %connection, "Release of a slot that is not in use");
            debug_assert!(false, "release of free {slot}");
            return;
        }
        *entry = Slot::default();
        state.active -= 1;
        let idle = state.active == 0;
        drop(state);

        self.inner.available.notify_one();
        if idle {
            self.inner.drained.notify_waiters();
        }
    }

    /// Number of slots currently in use
    pub fn active(&self) -> usize {
        self.lock().active
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        let state = self.lock();
        state.slots.len() - state.active
    }

    /// Wait until no slot is in use
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Point-in-time view of the pool
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        PoolSnapshot {
            capacity: state.slots.len(),
            active: state.active,
            bindings: state
                .slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| slot.connection.map(|c| (SlotId::new(index), c)))
                .collect(),
        }
    }
}

impl fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SlotPool")
            .field("capacity", &state.slots.len())
            .field("active", &state.active)
            .finish()
    }
}

/// A reserved slot
///
/// The slot returns to its pool when the guard is dropped.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct SlotGuard {
    pool: SlotPool,
    slot: SlotId,
    connection: ConnectionId,
}

impl SlotGuard {
    /// The reserved slot
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The connection bound to the slot
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.pool.release(self.slot, self.connection);
        tracing::trace!(slot = %self.slot, connection_id = %self.connection, "Slot released");
    }
}

impl fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGuard")
            .field("slot", &self.slot)
            .field("connection", &self.connection)
            .finish()
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Total number of slots
    pub capacity: usize,
    /// Slots in use
    pub active: usize,
    /// Slot to connection bindings for every slot in use
    pub bindings: Vec<(SlotId, ConnectionId)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            SlotPool::new(0),
            Err(ServiceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_try_acquire_until_full() {
        let pool = SlotPool::new(2).unwrap();
        let a = pool.try_acquire(conn(1)).unwrap();
        let b = pool.try_acquire(conn(2)).unwrap();
        assert_ne!(a.slot(), b.slot());
        assert_eq!(pool.active(), 2);
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire(conn(3)).is_none());

        drop(a);
        assert_eq!(pool.active(), 1);
        let c = pool.try_acquire(conn(3)).unwrap();
        assert_eq!(c.connection(), conn(3));
    }

    #[test]
    fn test_snapshot_bindings() {
        let pool = SlotPool::new(3).unwrap();
        let guard = pool.try_acquire(conn(7)).unwrap();
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.capacity, 3);
        assert_eq!(snapshot.active, 1);
        assert_eq!(snapshot.bindings, vec![(guard.slot(), conn(7))]);

        drop(guard);
        assert!(pool.snapshot().bindings.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let pool = SlotPool::new(1).unwrap();
        let held = pool.acquire(conn(1)).await;

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire(conn(2)).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(pool.active(), 1);

        drop(held);
        let guard = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guard.connection(), conn(2));
        assert_eq!(pool.active(), 1);
    }

    #[tokio::test]
    async fn test_wait_idle() {
        let pool = SlotPool::new(2).unwrap();
        pool.wait_idle().await;

        let guard = pool.acquire(conn(1)).await;
        let idle = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.wait_idle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!idle.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), idle)
            .await
            .unwrap()
            .unwrap();
    }
}
