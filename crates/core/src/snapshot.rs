// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::ControllerId;
use crate::sched::ContextId;
use crate::vector::{BoundBehavior, Irq, LineSignal, VectorId, VectorKind};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    pub irq_count: Irq,
    pub controllers: Vec<ControllerSnapshot>,
    /// Every vector that is not unbound, in vector order.
    pub vectors: Vec<VectorSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub id: ControllerId,
    pub name: String,
    pub base_irq: Irq,
    pub line_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VectorSnapshot {
    pub vector: VectorId,
    pub kind: VectorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub irq: Irq,
    pub controller: ControllerId,
    pub pin: u32,
    pub signal: LineSignal,
    pub enabled: bool,
    pub pending: bool,
    pub unmasked: bool,
    pub waiters: Vec<ContextId>,
    /// Woken waiter the pending occurrence is held for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted: Option<ContextId>,
    pub behavior: BoundBehavior,
}

impl SystemSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn line(&self, irq: Irq) -> Option<&LineSnapshot> {
        self.vectors
            .iter()
            .filter_map(|v| v.line.as_ref())
            .find(|l| l.irq == irq)
    }
}
