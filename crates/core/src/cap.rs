// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Capability invocation surface for interrupt lines.
//!
//! Every operation checks its arguments before touching anything, so a
//! rejected invocation has no side effects.

use crate::sched::{ContextId, Dispatch, Scheduler, Transaction};
use crate::system::InterruptSystem;
use crate::trap::{self, Delivery};
use crate::vector::{BoundBehavior, InterruptLine, Irq, VectorId};
use crate::RequestError;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    GetType,
    GetIrqWait,
    BindIrq,
    Wait,
    Enable,
    Disable,
}

impl OpCode {
    pub const ALL: [OpCode; 6] = [
        OpCode::GetType,
        OpCode::GetIrqWait,
        OpCode::BindIrq,
        OpCode::Wait,
        OpCode::Enable,
        OpCode::Disable,
    ];

    pub const fn code(self) -> u32 {
        match self {
            OpCode::GetType => 1,
            OpCode::GetIrqWait => 2,
            OpCode::BindIrq => 3,
            OpCode::Wait => 4,
            OpCode::Enable => 5,
            OpCode::Disable => 6,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }
}

/// Raw invocation as it arrives from the capability layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub op_code: u32,
    pub operands: Vec<u32>,
}

impl Invocation {
    pub fn new(op: OpCode, operands: &[u32]) -> Self {
        Self {
            op_code: op.code(),
            operands: operands.to_vec(),
        }
    }

    fn op(&self) -> Result<OpCode, RequestError> {
        OpCode::from_code(self.op_code).ok_or(RequestError::UnknownOperation(self.op_code))
    }

    fn no_operands(&self) -> Result<(), RequestError> {
        match self.operands.len() {
            0 => Ok(()),
            _ => Err(RequestError::ExtraArguments),
        }
    }

    fn irq_operand(&self) -> Result<Irq, RequestError> {
        match self.operands.as_slice() {
            [] => Err(RequestError::MissingArgument),
            [irq] => Ok(*irq),
            _ => Err(RequestError::ExtraArguments),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    IrqCtl,
    IrqWait,
}

/// Capability granting `wait` on a single IRQ. Carries no state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IrqWaitCap {
    pub irq: Irq,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Type(ObjectKind),
    IrqWait(IrqWaitCap),
    Done,
    Error(RequestError),
}

/// The interrupt-control capability.
#[derive(Debug, Clone)]
pub struct IrqCtl {
    system: Arc<InterruptSystem>,
    scheduler: Arc<dyn Scheduler>,
}

impl IrqCtl {
    pub fn new(system: Arc<InterruptSystem>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self { system, scheduler }
    }

    pub fn system(&self) -> &Arc<InterruptSystem> {
        &self.system
    }

    /// Dispatches one invocation on behalf of `ctx`.
    ///
    /// Returns [`Dispatch::Abandoned`] only from `wait`, after the caller
    /// has been queued; it must be dispatched again from the top once woken.
    pub fn invoke(&self, ctx: ContextId, inv: &Invocation) -> Dispatch<Reply> {
        let tx = Transaction::begin(ctx);
        match self.try_invoke(tx, inv) {
            Ok(dispatch) => dispatch,
            Err(err) => {
                debug!("{} invocation {:#x} rejected: {}", ctx, inv.op_code, err);
                Dispatch::Committed(Reply::Error(err))
            }
        }
    }

    fn try_invoke(
        &self,
        tx: Transaction,
        inv: &Invocation,
    ) -> Result<Dispatch<Reply>, RequestError> {
        let reply = match inv.op()? {
            OpCode::GetType => {
                inv.no_operands()?;
                Reply::Type(ObjectKind::IrqCtl)
            }
            OpCode::GetIrqWait => {
                let (irq, _) = self.line_operand(inv)?;
                Reply::IrqWait(IrqWaitCap { irq })
            }
            OpCode::BindIrq => {
                let (irq, line) = self.line_operand(inv)?;
                line.lock().bind();
                debug!("IRQ {} bound", irq);
                Reply::Done
            }
            OpCode::Wait => {
                let (_, line) = self.line_operand(inv)?;
                return Ok(wait(&self.system, line, tx));
            }
            OpCode::Enable => {
                let (irq, _) = self.line_operand(inv)?;
                self.system.enable_irq(irq)?;
                Reply::Done
            }
            OpCode::Disable => {
                let (irq, _) = self.line_operand(inv)?;
                self.system.disable_irq(irq)?;
                Reply::Done
            }
        };
        Ok(tx.commit(reply))
    }

    fn line_operand(&self, inv: &Invocation) -> Result<(Irq, InterruptLine<'_>), RequestError> {
        let irq = inv.irq_operand()?;
        Ok((irq, self.system.lookup(irq)?))
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Trap entry for `vector`, waking through this capability's scheduler.
    pub fn deliver(&self, vector: VectorId) -> Delivery {
        trap::deliver(&self.system, self.scheduler.as_ref(), vector)
    }
}

impl IrqWaitCap {
    /// Invokes the capability. The IRQ was checked when the capability was
    /// minted, but is looked up again since the operand came from a caller.
    pub fn invoke(
        &self,
        system: &InterruptSystem,
        ctx: ContextId,
        inv: &Invocation,
    ) -> Dispatch<Reply> {
        let tx = Transaction::begin(ctx);
        let result = inv.op().and_then(|op| {
            inv.no_operands()?;
            match op {
                OpCode::GetType => Ok(tx.commit(Reply::Type(ObjectKind::IrqWait))),
                OpCode::Wait => {
                    let line = system.lookup(self.irq)?;
                    Ok(wait(system, line, tx))
                }
                _ => Err(RequestError::UnknownOperation(inv.op_code)),
            }
        });
        result.unwrap_or_else(|err| Dispatch::Committed(Reply::Error(err)))
    }
}

/// Consumes a pending occurrence or queues the caller and abandons.
///
/// The pending bit is tested and cleared, and the commit taken, under one
/// hold of the line lock: a second waiter cannot observe the same occurrence.
/// An occurrence granted to a woken waiter is left for that waiter; anyone
/// else queues behind it. Waiting claims the line for the caller.
fn wait(system: &InterruptSystem, line: InterruptLine<'_>, tx: Transaction) -> Dispatch<Reply> {
    let controller = system.controller(line.controller());
    let mut guard = line.lock();

    if guard.take_pending(tx.context()) {
        let config = guard.config();
        controller.late_ack(&config);
        debug!("{} consumes IRQ {}", tx.context(), line.irq());
        let done = tx.commit(Reply::Done);
        drop(guard);
        return done;
    }

    if guard.behavior() == BoundBehavior::Default {
        debug!("IRQ {} bound by waiting {}", line.irq(), tx.context());
        guard.bind();
    }
    guard.enqueue_waiter(tx.context());
    // A granted occurrence still owes its late ack; the grantee re-arms.
    if !guard.is_pending() && guard.arm() {
        debug!("IRQ {} unmasked on first wait", line.irq());
        controller.enable(&guard.config());
    }
    drop(guard);
    tx.abandon()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_codes() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_code(op.code()), Some(op));
        }
        assert_eq!(OpCode::from_code(0), None);
        assert_eq!(OpCode::from_code(7), None);
    }

    #[test]
    fn test_operand_checks() {
        let inv = Invocation::new(OpCode::Wait, &[]);
        assert_eq!(inv.irq_operand(), Err(RequestError::MissingArgument));
        let inv = Invocation::new(OpCode::Wait, &[1, 2]);
        assert_eq!(inv.irq_operand(), Err(RequestError::ExtraArguments));
        let inv = Invocation::new(OpCode::Wait, &[9]);
        assert_eq!(inv.irq_operand(), Ok(9));
        let inv = Invocation {
            op_code: 0x42,
            operands: vec![],
        };
        assert_eq!(inv.op(), Err(RequestError::UnknownOperation(0x42)));
    }
}
