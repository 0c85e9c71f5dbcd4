// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko

mod common;

use irqcore::sched::ReadyQueue;
use irqcore::system::builder::SimulatedPlatform;
use irqcore::{ContextId, Dispatch, Invocation, IrqCtl, OpCode, Reply, RequestError};
use proptest::prelude::*;
use std::sync::Arc;

fn busy_platform() -> (SimulatedPlatform, IrqCtl) {
    let platform = common::boot(&[("ioapic0", 0, 8), ("ioapic1", 16, 8)]);
    let ctl = IrqCtl::new(platform.system.clone(), Arc::new(ReadyQueue::new()));
    ctl.invoke(ContextId::new(1), &Invocation::new(OpCode::BindIrq, &[2]));
    ctl.invoke(ContextId::new(1), &Invocation::new(OpCode::Wait, &[2]));
    (platform, ctl)
}

fn irq_ops() -> impl Strategy<Value = OpCode> {
    prop::sample::select(
        OpCode::ALL
            .into_iter()
            .filter(|&op| op != OpCode::GetType)
            .collect::<Vec<_>>(),
    )
}

fn assert_untouched(platform: &SimulatedPlatform, ctl: &IrqCtl, inv: &Invocation, expected: RequestError) {
    let snap = platform.system.snapshot();
    let journals: Vec<_> = platform.routers.iter().map(|r| r.journal()).collect();

    let reply = ctl.invoke(ContextId::new(9), inv);
    assert_eq!(reply, Dispatch::Committed(Reply::Error(expected)));

    assert_eq!(platform.system.snapshot(), snap);
    let after: Vec<_> = platform.routers.iter().map(|r| r.journal()).collect();
    assert_eq!(after, journals);
}

proptest! {
    #[test]
    fn test_out_of_range_irq_is_rejected(op in irq_ops(), irq in 24u32..) {
        let (platform, ctl) = busy_platform();
        assert_untouched(
            &platform,
            &ctl,
            &Invocation::new(op, &[irq]),
            RequestError::IrqOutOfRange { irq, limit: 24 },
        );
    }

    #[test]
    fn test_unmapped_irq_is_rejected(op in irq_ops(), irq in 8u32..16) {
        let (platform, ctl) = busy_platform();
        assert_untouched(&platform, &ctl, &Invocation::new(op, &[irq]), RequestError::UnmappedIrq(irq));
    }

    #[test]
    fn test_extra_operands_are_rejected(
        op in irq_ops(),
        operands in prop::collection::vec(0u32..8, 2..5),
    ) {
        let (platform, ctl) = busy_platform();
        assert_untouched(&platform, &ctl, &Invocation::new(op, &operands), RequestError::ExtraArguments);
    }

    #[test]
    fn test_unknown_operations_are_rejected(code in 7u32.., irq in 0u32..8) {
        let (platform, ctl) = busy_platform();
        let inv = Invocation { op_code: code, operands: vec![irq] };
        assert_untouched(&platform, &ctl, &inv, RequestError::UnknownOperation(code));
    }

    #[test]
    fn test_get_irq_wait_never_mutates(irq in 0u32..8, repeats in 1usize..5) {
        let (platform, ctl) = busy_platform();
        let snap = platform.system.snapshot();
        for _ in 0..repeats {
            let reply = ctl.invoke(ContextId::new(3), &Invocation::new(OpCode::GetIrqWait, &[irq]));
            prop_assert!(reply.is_committed());
        }
        prop_assert_eq!(platform.system.snapshot(), snap);
    }
}

#[test]
fn test_missing_operand_is_rejected() {
    let (platform, ctl) = busy_platform();
    for op in OpCode::ALL.into_iter().filter(|&op| op != OpCode::GetType) {
        assert_untouched(&platform, &ctl, &Invocation::new(op, &[]), RequestError::MissingArgument);
    }
}

#[test]
fn test_opcode_zero_is_unknown() {
    let (platform, ctl) = busy_platform();
    let inv = Invocation {
        op_code: 0,
        operands: vec![],
    };
    assert_untouched(&platform, &ctl, &inv, RequestError::UnknownOperation(0));
}
