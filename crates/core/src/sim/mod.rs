// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Software models of the hardware the core drives, for hosted runs and tests.

pub mod ioapic;
pub mod lapic;
pub mod ports;

pub use ioapic::{EntryHalf, EntryWrite, SimIoApic, SimIoApicState};
pub use lapic::SimLapic;
pub use ports::SimPorts;
