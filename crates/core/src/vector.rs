// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The process-wide vector table and its reverse IRQ index.
//!
//! The table is assembled once by [`VectorTableBuilder`] during boot and is
//! immutable afterwards, apart from the per-line state that sits behind each
//! entry's own lock and is only reachable through [`LineGuard`].

use crate::interrupt::ControllerId;
use crate::sched::ContextId;
use crate::{lock, BootError, LookupError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Global interrupt line number, independent of the router serving it.
pub type Irq = u32;

pub use irqcore_config::MAX_IRQS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VectorId(u8);

impl VectorId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    Unbound,
    Interrupt,
    /// Exceptions, system-call gates and anything else that is not a device line.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    Edge,
    Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Electrical characteristics of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LineSignal {
    /// Not yet known: legacy bus default, edge triggered and active high.
    FromBus,
    Resolved {
        trigger: TriggerMode,
        polarity: Polarity,
    },
}

impl LineSignal {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LineSignal::Resolved { .. })
    }

    pub fn trigger(&self) -> TriggerMode {
        match self {
            LineSignal::FromBus => TriggerMode::Edge,
            LineSignal::Resolved { trigger, .. } => *trigger,
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            LineSignal::FromBus => Polarity::ActiveHigh,
            LineSignal::Resolved { polarity, .. } => *polarity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundBehavior {
    #[default]
    Default,
    /// A capability holder has claimed the line and handles it from user level.
    BoundIrq,
}

/// Where an `Interrupt` vector is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineBinding {
    pub irq: Irq,
    pub controller: ControllerId,
    /// Line number local to the controller.
    pub pin: u32,
}

/// A consistent copy of a line's configuration handed to controller operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub vector: VectorId,
    pub irq: Irq,
    pub pin: u32,
    pub signal: LineSignal,
    pub enabled: bool,
}

#[derive(Debug)]
struct LineState {
    signal: LineSignal,
    enabled: bool,
    pending: bool,
    unmasked: bool,
    waiters: VecDeque<ContextId>,
    /// Waiter woken for the latched occurrence and not yet re-dispatched.
    granted: Option<ContextId>,
    behavior: BoundBehavior,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            signal: LineSignal::FromBus,
            enabled: false,
            pending: false,
            unmasked: false,
            waiters: VecDeque::new(),
            granted: None,
            behavior: BoundBehavior::Default,
        }
    }
}

#[derive(Debug)]
pub struct VectorEntry {
    id: VectorId,
    kind: VectorKind,
    binding: Option<LineBinding>,
    state: Mutex<LineState>,
}

impl VectorEntry {
    pub fn id(&self) -> VectorId {
        self.id
    }

    pub fn kind(&self) -> VectorKind {
        self.kind
    }

    pub fn binding(&self) -> Option<&LineBinding> {
        self.binding.as_ref()
    }

    /// The interrupt line behind this vector, if it serves one.
    pub fn line(&self) -> Option<InterruptLine<'_>> {
        self.binding.as_ref().map(|binding| InterruptLine {
            entry: self,
            binding,
        })
    }
}

/// Borrowed view of an `Interrupt` vector.
#[derive(Debug, Clone, Copy)]
pub struct InterruptLine<'a> {
    entry: &'a VectorEntry,
    binding: &'a LineBinding,
}

impl<'a> InterruptLine<'a> {
    pub fn vector(&self) -> VectorId {
        self.entry.id
    }

    pub fn irq(&self) -> Irq {
        self.binding.irq
    }

    pub fn controller(&self) -> ControllerId {
        self.binding.controller
    }

    pub fn pin(&self) -> u32 {
        self.binding.pin
    }

    pub fn lock(&self) -> LineGuard<'a> {
        LineGuard {
            vector: self.entry.id,
            binding: self.binding,
            state: lock(&self.entry.state),
        }
    }
}

/// Exclusive access to one line's mutable state.
///
/// Every check-and-update of `pending`, `unmasked` and the waiter queue goes
/// through a single guard, so no caller can observe the pending bit and then
/// clear it after someone else already has.
#[derive(Debug)]
pub struct LineGuard<'a> {
    vector: VectorId,
    binding: &'a LineBinding,
    state: MutexGuard<'a, LineState>,
}

impl LineGuard<'_> {
    pub fn config(&self) -> LineConfig {
        LineConfig {
            vector: self.vector,
            irq: self.binding.irq,
            pin: self.binding.pin,
            signal: self.state.signal,
            enabled: self.state.enabled,
        }
    }

    pub fn signal(&self) -> LineSignal {
        self.state.signal
    }

    pub fn set_signal(&mut self, trigger: TriggerMode, polarity: Polarity) {
        self.state.signal = LineSignal::Resolved { trigger, polarity };
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.state.enabled = enabled;
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending
    }

    pub fn latch_pending(&mut self) {
        self.state.pending = true;
    }

    /// Clears the pending bit on behalf of `ctx`, returning whether it was
    /// set. An occurrence granted to a woken waiter can only be taken by that
    /// waiter.
    pub fn take_pending(&mut self, ctx: ContextId) -> bool {
        if !self.state.pending || self.state.granted.is_some_and(|owner| owner != ctx) {
            return false;
        }
        self.state.pending = false;
        self.state.granted = None;
        true
    }

    pub fn is_unmasked(&self) -> bool {
        self.state.unmasked
    }

    /// Records that the line is unmasked at the router. Returns `false` when
    /// it already was, so the caller knows whether the hardware needs touching.
    pub fn arm(&mut self) -> bool {
        if self.state.unmasked {
            return false;
        }
        self.state.unmasked = true;
        self.state.enabled = true;
        true
    }

    /// Records that the line has been masked at the router.
    pub fn disarm(&mut self) {
        self.state.unmasked = false;
        self.state.enabled = false;
    }

    pub fn enqueue_waiter(&mut self, ctx: ContextId) {
        self.state.waiters.push_back(ctx);
    }

    /// Hands the latched occurrence to the head waiter, if any.
    pub fn grant_head(&mut self) -> Option<ContextId> {
        let ctx = self.state.waiters.pop_front()?;
        self.state.granted = Some(ctx);
        Some(ctx)
    }

    pub fn granted(&self) -> Option<ContextId> {
        self.state.granted
    }

    pub fn waiters(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.state.waiters.iter().copied()
    }

    pub fn waiter_count(&self) -> usize {
        self.state.waiters.len()
    }

    pub fn behavior(&self) -> BoundBehavior {
        self.state.behavior
    }

    pub fn bind(&mut self) {
        self.state.behavior = BoundBehavior::BoundIrq;
    }
}

#[derive(Debug)]
pub struct VectorTable {
    entries: Vec<VectorEntry>,
    irq_index: Vec<Option<VectorId>>,
    irq_count: Irq,
}

impl VectorTable {
    /// Maps a global IRQ to the line serving it.
    pub fn lookup(&self, irq: Irq) -> Result<InterruptLine<'_>, LookupError> {
        if irq >= self.irq_count {
            return Err(LookupError::OutOfRange {
                irq,
                limit: self.irq_count,
            });
        }
        self.irq_index
            .get(irq as usize)
            .copied()
            .flatten()
            .and_then(|vector| self.line(vector))
            .ok_or(LookupError::Unmapped(irq))
    }

    pub fn entry(&self, vector: VectorId) -> Option<&VectorEntry> {
        self.entries.get(vector.index())
    }

    pub fn line(&self, vector: VectorId) -> Option<InterruptLine<'_>> {
        self.entry(vector).and_then(VectorEntry::line)
    }

    pub fn entries(&self) -> impl Iterator<Item = &VectorEntry> {
        self.entries.iter()
    }

    /// All `Interrupt` vectors in vector order.
    pub fn lines(&self) -> impl Iterator<Item = InterruptLine<'_>> {
        self.entries.iter().filter_map(VectorEntry::line)
    }

    /// One past the highest IRQ any registered router serves.
    pub fn irq_count(&self) -> Irq {
        self.irq_count
    }

    pub fn vector_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    kind: VectorKind,
    binding: Option<LineBinding>,
}

/// Boot-time construction of the [`VectorTable`]. Single-threaded by construction.
#[derive(Debug)]
pub struct VectorTableBuilder {
    slots: Vec<Slot>,
    irq_index: Vec<Option<VectorId>>,
    irq_count: Irq,
}

impl VectorTableBuilder {
    pub fn new(vector_count: usize) -> Self {
        let vector_count = vector_count.min(u8::MAX as usize + 1);
        Self {
            slots: vec![
                Slot {
                    kind: VectorKind::Unbound,
                    binding: None,
                };
                vector_count
            ],
            irq_index: Vec::new(),
            irq_count: 0,
        }
    }

    /// Keeps a vector away from device lines.
    pub fn reserve(&mut self, vector: u8) {
        if let Some(slot) = self.slots.get_mut(vector as usize) {
            if slot.kind == VectorKind::Unbound {
                slot.kind = VectorKind::Other;
            }
        }
    }

    /// Extends the declared IRQ range. Never shrinks it.
    pub fn note_irq_range(&mut self, base_irq: Irq, line_count: u32) {
        let end = base_irq.saturating_add(line_count);
        if end > self.irq_count {
            debug!("IRQ range grows {} -> {}", self.irq_count, end);
            self.irq_count = end;
        }
    }

    /// Binds the first free vector to `base_irq + local_line` on `controller`.
    /// The new line starts disabled with a from-bus signal.
    pub fn allocate_vector(
        &mut self,
        controller: ControllerId,
        base_irq: Irq,
        local_line: u32,
    ) -> Result<VectorId, BootError> {
        let irq = base_irq
            .checked_add(local_line)
            .filter(|&irq| irq < MAX_IRQS)
            .ok_or(BootError::IrqRange {
                base_irq,
                line_count: local_line.saturating_add(1),
            })?;
        if let Some(Some(vector)) = self.irq_index.get(irq as usize) {
            return Err(BootError::DuplicateIrq {
                irq,
                vector: *vector,
            });
        }

        let index = self
            .slots
            .iter()
            .position(|slot| slot.kind == VectorKind::Unbound)
            .ok_or(BootError::VectorSpaceExhausted { irq })?;
        let vector = VectorId::new(index as u8);

        self.slots[index] = Slot {
            kind: VectorKind::Interrupt,
            binding: Some(LineBinding {
                irq,
                controller,
                pin: local_line,
            }),
        };
        if self.irq_index.len() <= irq as usize {
            self.irq_index.resize(irq as usize + 1, None);
        }
        self.irq_index[irq as usize] = Some(vector);
        self.note_irq_range(irq, 1);

        Ok(vector)
    }

    pub fn irq_count(&self) -> Irq {
        self.irq_count
    }

    pub fn build(self) -> VectorTable {
        let entries = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| VectorEntry {
                id: VectorId::new(index as u8),
                kind: slot.kind,
                binding: slot.binding,
                state: Mutex::new(LineState::default()),
            })
            .collect();

        VectorTable {
            entries,
            irq_index: self.irq_index,
            irq_count: self.irq_count,
        }
    }
}
