// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::vector::{Irq, LineConfig};
use crate::BootError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Capacity of the controller registry.
pub const MAX_CONTROLLERS: usize = irqcore_config::MAX_ROUTERS;

/// Trait representing an interrupt router.
///
/// This is the whole contract the rest of the kernel has with routing
/// hardware. Callers hold `&dyn InterruptController` and never a concrete type.
/// Every operation is short and non-blocking, and may be called while the
/// line's vector lock is held.
pub trait InterruptController: Debug + Send + Sync {
    /// Program trigger mode and polarity from the line's resolved signal.
    ///
    /// Must not be called while the signal is still from-bus.
    fn setup(&self, line: &LineConfig);

    /// Let the router deliver the line. Idempotent.
    fn enable(&self, line: &LineConfig);

    /// Stop the router from delivering the line. Idempotent.
    fn disable(&self, line: &LineConfig);

    /// Best-effort liveness check of the line.
    fn is_pending(&self, line: &LineConfig) -> bool;

    /// Acknowledge on receipt, before any blocking work. Edge lines only.
    fn early_ack(&self, line: &LineConfig);

    /// Acknowledge after the interrupt has been serviced. Level lines only.
    fn late_ack(&self, line: &LineConfig);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControllerId(u8);

impl ControllerId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct ControllerSlot {
    pub name: String,
    pub base_irq: Irq,
    pub line_count: u32,
    controller: Arc<dyn InterruptController>,
}

impl ControllerSlot {
    pub fn controller(&self) -> &dyn InterruptController {
        self.controller.as_ref()
    }
}

/// Fixed-capacity owner of every interrupt router, alive for the whole run.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    slots: Vec<ControllerSlot>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        base_irq: Irq,
        line_count: u32,
        controller: Arc<dyn InterruptController>,
    ) -> Result<ControllerId, BootError> {
        if self.slots.len() == MAX_CONTROLLERS {
            return Err(BootError::TooManyControllers {
                capacity: MAX_CONTROLLERS,
            });
        }
        let id = ControllerId::new(self.slots.len() as u8);
        self.slots.push(ControllerSlot {
            name: name.into(),
            base_irq,
            line_count,
            controller,
        });
        Ok(id)
    }

    pub fn get(&self, id: ControllerId) -> Option<&ControllerSlot> {
        self.slots.get(id.index())
    }

    pub fn controller(&self, id: ControllerId) -> Option<&dyn InterruptController> {
        self.get(id).map(ControllerSlot::controller)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControllerId, &ControllerSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (ControllerId::new(i as u8), slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::ops::Index<ControllerId> for ControllerRegistry {
    type Output = ControllerSlot;

    fn index(&self, id: ControllerId) -> &ControllerSlot {
        &self.slots[id.index()]
    }
}
