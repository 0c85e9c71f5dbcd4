// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod cap;
pub mod interrupt;
pub mod ioapic;
pub mod mmio;
pub mod mode;
pub mod sched;
pub mod sim;
pub mod snapshot;
pub mod system;
pub mod trap;
pub mod vector;

pub use cap::{Invocation, IrqCtl, IrqWaitCap, ObjectKind, OpCode, Reply};
pub use interrupt::{ControllerId, ControllerRegistry, InterruptController, MAX_CONTROLLERS};
pub use sched::{ContextId, Dispatch, Scheduler, Transaction};
pub use system::{BootOptions, InterruptSystem, InterruptSystemBuilder};
pub use vector::{Irq, LineConfig, LineSignal, Polarity, TriggerMode, VectorId, VectorKind};

/// Fatal conditions raised while bringing the interrupt subsystem up.
///
/// None of these are recoverable: a router that mis-initializes cannot be
/// trusted to deliver any device interrupt, so the caller is expected to halt.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BootError {
    #[error("Too many interrupt routers (capacity {capacity})")]
    TooManyControllers { capacity: usize },
    #[error("No free vector left for IRQ {irq}")]
    VectorSpaceExhausted { irq: Irq },
    #[error("IRQs from {base_irq} over {line_count} line(s) exceed the global IRQ space")]
    IrqRange { base_irq: Irq, line_count: u32 },
    #[error("IRQ {irq} is already served by vector {vector}")]
    DuplicateIrq { irq: Irq, vector: VectorId },
    #[error("Routing entry for vector {vector} reads back vector {readback}")]
    RoutingMismatch { vector: VectorId, readback: u8 },
    #[error("Reverting to legacy interrupt delivery is not supported")]
    ShutdownUnsupported,
}

/// Malformed invocation arguments. Reported to the caller, never fatal.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq, serde::Serialize)]
pub enum RequestError {
    #[error("IRQ {irq} is out of range (limit {limit})")]
    IrqOutOfRange { irq: u32, limit: u32 },
    #[error("IRQ {0} is not served by any router")]
    UnmappedIrq(u32),
    #[error("Missing IRQ operand")]
    MissingArgument,
    #[error("Unexpected operands")]
    ExtraArguments,
    #[error("Unknown operation {0:#x}")]
    UnknownOperation(u32),
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("IRQ {irq} is out of range (limit {limit})")]
    OutOfRange { irq: Irq, limit: Irq },
    #[error("IRQ {0} is not served by any router")]
    Unmapped(Irq),
}

impl From<LookupError> for RequestError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::OutOfRange { irq, limit } => RequestError::IrqOutOfRange { irq, limit },
            LookupError::Unmapped(irq) => RequestError::UnmappedIrq(irq),
        }
    }
}

/// A 32-bit register window, addressed by byte offset from its base.
pub trait RegisterWindow: std::fmt::Debug + Send {
    fn read_u32(&self, offset: u64) -> u32;
    fn write_u32(&mut self, offset: u64, value: u32);
}

/// Byte-wide I/O port access.
pub trait PortIo: std::fmt::Debug + Send {
    fn outb(&mut self, port: u16, value: u8);
}

/// End-of-interrupt signalling towards the CPU-local interrupt unit.
pub trait EndOfInterrupt: std::fmt::Debug + Send + Sync {
    fn signal_eoi(&self);
}

/// Locks a mutex, taking the data over from a panicked holder.
pub(crate) fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
