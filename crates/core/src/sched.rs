// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The slice of the scheduler this core relies on.
//!
//! Invocations are transactions. One either reaches its commit point and
//! delivers a reply, or is abandoned with no visible effect and dispatched
//! again from the start once something wakes its context. Nothing survives
//! an abandon except what the invocation already recorded in shared state.

use crate::lock;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Condvar, Mutex};
use tracing::debug;

/// Identifies an invoking thread of control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx:{}", self.0)
    }
}

/// Re-dispatch primitive. `wake` must not block: it is called from trap context.
pub trait Scheduler: fmt::Debug + Send + Sync {
    fn wake(&self, ctx: ContextId);
}

/// Outcome of one dispatch of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<R> {
    Committed(R),
    /// Retry from the entry point after the context is woken.
    Abandoned,
}

impl<R> Dispatch<R> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Dispatch::Committed(_))
    }

    pub fn committed(self) -> Option<R> {
        match self {
            Dispatch::Committed(r) => Some(r),
            Dispatch::Abandoned => None,
        }
    }
}

/// One dispatch attempt. Consumed by exactly one of `commit` or `abandon`.
#[derive(Debug)]
#[must_use = "a transaction must be committed or abandoned"]
pub struct Transaction {
    ctx: ContextId,
}

impl Transaction {
    pub fn begin(ctx: ContextId) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> ContextId {
        self.ctx
    }

    /// Passes the commit point. Cannot yield, so it is safe to call with a
    /// vector lock held.
    pub fn commit<R>(self, reply: R) -> Dispatch<R> {
        Dispatch::Committed(reply)
    }

    pub fn abandon<R>(self) -> Dispatch<R> {
        debug!("{} abandons its invocation", self.ctx);
        Dispatch::Abandoned
    }
}

/// FIFO run queue for single-threaded dispatch loops.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    ready: Mutex<VecDeque<ContextId>>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next context to re-dispatch, in wake order.
    pub fn next(&self) -> Option<ContextId> {
        lock(&self.ready).pop_front()
    }

    pub fn len(&self) -> usize {
        lock(&self.ready).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.ready).is_empty()
    }
}

impl Scheduler for ReadyQueue {
    fn wake(&self, ctx: ContextId) {
        lock(&self.ready).push_back(ctx);
    }
}

/// Parks OS threads standing in for contexts until they are woken.
///
/// A wake that arrives before the matching `park` is kept as a token, so the
/// window between an abandon and the park cannot lose it.
#[derive(Debug, Default)]
pub struct ParkingScheduler {
    tokens: Mutex<HashSet<ContextId>>,
    cond: Condvar,
}

impl ParkingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `ctx` has been woken, consuming the wake.
    pub fn park(&self, ctx: ContextId) {
        let mut tokens = lock(&self.tokens);
        while !tokens.remove(&ctx) {
            tokens = self
                .cond
                .wait(tokens)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

impl Scheduler for ParkingScheduler {
    fn wake(&self, ctx: ContextId) {
        lock(&self.tokens).insert(ctx);
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ready_queue_is_fifo() {
        let q = ReadyQueue::new();
        q.wake(ContextId::new(3));
        q.wake(ContextId::new(1));
        assert_eq!(q.len(), 2);
        assert_eq!(q.next(), Some(ContextId::new(3)));
        assert_eq!(q.next(), Some(ContextId::new(1)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_transaction_outcomes() {
        let t = Transaction::begin(ContextId::new(7));
        assert_eq!(t.context(), ContextId::new(7));
        assert_eq!(t.commit(5u32), Dispatch::Committed(5));

        let t = Transaction::begin(ContextId::new(7));
        let d: Dispatch<u32> = t.abandon();
        assert!(!d.is_committed());
        assert_eq!(d.committed(), None);
    }

    #[test]
    fn test_wake_before_park_is_not_lost() {
        let s = ParkingScheduler::new();
        s.wake(ContextId::new(1));
        s.park(ContextId::new(1));
    }

    #[test]
    fn test_park_blocks_until_woken() {
        let s = Arc::new(ParkingScheduler::new());
        let parked = {
            let s = s.clone();
            std::thread::spawn(move || s.park(ContextId::new(9)))
        };
        s.wake(ContextId::new(8));
        s.wake(ContextId::new(9));
        parked.join().unwrap();
        // The unrelated wake stays banked.
        s.park(ContextId::new(8));
    }
}
