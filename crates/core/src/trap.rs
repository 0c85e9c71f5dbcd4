// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Hardware interrupt delivery, the producer side of the wait protocol.

use crate::sched::{ContextId, Scheduler};
use crate::system::InterruptSystem;
use crate::vector::{BoundBehavior, TriggerMode, VectorId};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Pending latched with nobody waiting.
    Latched,
    /// Pending latched and granted to the head waiter, which was re-dispatched.
    Woke(ContextId),
    /// The occurrence already granted to a woken waiter absorbs this one.
    Coalesced,
    /// No capability holder claims the line; it was masked and acknowledged.
    Unclaimed,
    /// The vector does not serve a device line.
    Spurious,
}

/// Handles one interrupt arriving on `vector`.
///
/// Edge lines are acknowledged before anything else. A claimed line latches
/// its pending bit and grants it to at most one waiter, which is woken after
/// the line lock is dropped. A claimed level line is masked until the next `wait` re-arms it,
/// since the device keeps asserting until it is serviced.
pub fn deliver(system: &InterruptSystem, scheduler: &dyn Scheduler, vector: VectorId) -> Delivery {
    let Some(line) = system.table().line(vector) else {
        warn!("Spurious interrupt on vector {}", vector);
        return Delivery::Spurious;
    };
    let controller = system.controller(line.controller());

    let mut guard = line.lock();
    let config = guard.config();
    controller.early_ack(&config);

    match guard.behavior() {
        BoundBehavior::BoundIrq => {
            let coalesced = guard.is_pending() && guard.granted().is_some();
            guard.latch_pending();
            if config.signal.trigger() == TriggerMode::Level {
                controller.disable(&config);
                guard.disarm();
            }
            if coalesced {
                debug!("IRQ {} merges into the occurrence already granted", line.irq());
                return Delivery::Coalesced;
            }
            let woken = guard.grant_head();
            drop(guard);

            match woken {
                Some(ctx) => {
                    debug!("IRQ {} wakes {}", line.irq(), ctx);
                    scheduler.wake(ctx);
                    Delivery::Woke(ctx)
                }
                None => {
                    debug!("IRQ {} latched with no waiter", line.irq());
                    Delivery::Latched
                }
            }
        }
        BoundBehavior::Default => {
            warn!("Unclaimed IRQ {} on vector {}, masking", line.irq(), vector);
            controller.disable(&config);
            controller.late_ack(&config);
            guard.disarm();
            Delivery::Unclaimed
        }
    }
}
