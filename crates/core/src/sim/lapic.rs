// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::EndOfInterrupt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Local APIC stand-in that only counts end-of-interrupt writes.
#[derive(Debug, Default)]
pub struct SimLapic {
    eoi: AtomicU64,
}

impl SimLapic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eoi_count(&self) -> u64 {
        self.eoi.load(Ordering::SeqCst)
    }
}

impl EndOfInterrupt for SimLapic {
    fn signal_eoi(&self) {
        self.eoi.fetch_add(1, Ordering::SeqCst);
    }
}
