// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Access to real hardware.

use crate::{PortIo, RegisterWindow};
use std::ptr::NonNull;

/// A mapped register window accessed with volatile 32-bit loads and stores.
#[derive(Debug)]
pub struct MmioWindow {
    base: NonNull<u32>,
}

// SAFETY: the window is a fixed device mapping, not thread-bound memory.
// Serialization of the index/data pair is the driver's job.
unsafe impl Send for MmioWindow {}

impl MmioWindow {
    /// # Safety
    ///
    /// `base` must be the virtual address of a mapped, uncached register
    /// window of at least 0x20 bytes that nothing else accesses.
    pub unsafe fn new(base: usize) -> Option<Self> {
        NonNull::new(base as *mut u32).map(|base| Self { base })
    }

    fn reg(&self, offset: u64) -> *mut u32 {
        (self.base.as_ptr() as *mut u8).wrapping_add(offset as usize) as *mut u32
    }
}

impl RegisterWindow for MmioWindow {
    fn read_u32(&self, offset: u64) -> u32 {
        // SAFETY: guaranteed mapped by the constructor's contract.
        unsafe { std::ptr::read_volatile(self.reg(offset)) }
    }

    fn write_u32(&mut self, offset: u64, value: u32) {
        // SAFETY: guaranteed mapped by the constructor's contract.
        unsafe { std::ptr::write_volatile(self.reg(offset), value) }
    }
}

/// x86 I/O port space through the `out` instruction.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct X86Ports {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl X86Ports {
    /// # Safety
    ///
    /// The caller must run with I/O privilege and own the ports it writes.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for X86Ports {
    fn outb(&mut self, port: u16, value: u8) {
        // SAFETY: I/O privilege is part of the constructor's contract.
        unsafe {
            std::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}
