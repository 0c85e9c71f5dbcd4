// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::ioapic::entry::{low_word_masked, low_word_read_only};
use crate::ioapic::{RoutingEntry, IOREGSEL, IOWIN, REG_ID, REG_TABLE_BASE, REG_VERSION};
use crate::{lock, RegisterWindow};
use serde::Serialize;
use std::sync::{Arc, Mutex};

const SIM_VERSION: u32 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryHalf {
    Low,
    High,
}

/// One data-window write that landed in the redirection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryWrite {
    pub pin: u32,
    pub half: EntryHalf,
    pub before: u32,
    pub after: u32,
}

#[derive(Debug)]
struct SimRegs {
    select: u32,
    entries: Vec<(u32, u32)>,
    journal: Vec<EntryWrite>,
}

/// Shared register state of a simulated I/O APIC.
#[derive(Debug)]
pub struct SimIoApicState {
    id: u8,
    lines: u8,
    regs: Mutex<SimRegs>,
}

impl SimIoApicState {
    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn lines(&self) -> u8 {
        self.lines
    }

    pub fn entry(&self, pin: u32) -> RoutingEntry {
        let regs = lock(&self.regs);
        let (lo, hi) = regs
            .entries
            .get(pin as usize)
            .copied()
            .unwrap_or((0, 0));
        RoutingEntry::from_words(lo, hi)
    }

    pub fn entries(&self) -> Vec<RoutingEntry> {
        let regs = lock(&self.regs);
        regs.entries
            .iter()
            .map(|&(lo, hi)| RoutingEntry::from_words(lo, hi))
            .collect()
    }

    pub fn journal(&self) -> Vec<EntryWrite> {
        lock(&self.regs).journal.clone()
    }

    /// Low-word writes that changed vector, polarity or trigger without the
    /// mask bit being set both before and after the write.
    pub fn masked_write_violations(&self) -> Vec<EntryWrite> {
        lock(&self.regs)
            .journal
            .iter()
            .filter(|w| w.half == EntryHalf::Low)
            .filter(|w| {
                let before = RoutingEntry::from_words(w.before, 0);
                let after = RoutingEntry::from_words(w.after, 0);
                before.delivery_changes(&after)
                    && !(low_word_masked(w.before) && low_word_masked(w.after))
            })
            .copied()
            .collect()
    }

    /// Overwrites a vector field behind the driver's back, as flaky hardware would.
    pub fn corrupt_vector(&self, pin: u32, vector: u8) {
        let mut regs = lock(&self.regs);
        if let Some(entry) = regs.entries.get_mut(pin as usize) {
            entry.0 = (entry.0 & !0xFF) | vector as u32;
        }
    }

    /// Sets the read-only status bits, as the router does while delivering.
    pub fn set_status(&self, pin: u32, status: u32) {
        let mut regs = lock(&self.regs);
        if let Some(entry) = regs.entries.get_mut(pin as usize) {
            entry.0 = (entry.0 & !low_word_read_only(u32::MAX)) | low_word_read_only(status);
        }
    }

    fn read_reg(&self, regs: &SimRegs, reg: u32) -> u32 {
        match reg {
            REG_ID => (self.id as u32 & 0x0F) << 24,
            REG_VERSION => SIM_VERSION | ((self.lines as u32 - 1) << 16),
            r if r >= REG_TABLE_BASE => {
                let index = r - REG_TABLE_BASE;
                match regs.entries.get((index / 2) as usize) {
                    Some(&(lo, _)) if index % 2 == 0 => lo,
                    Some(&(_, hi)) => hi,
                    None => 0,
                }
            }
            _ => 0,
        }
    }

    fn write_reg(&self, regs: &mut SimRegs, reg: u32, value: u32) {
        if reg < REG_TABLE_BASE {
            // ID and version are treated as read-only here.
            return;
        }
        let index = reg - REG_TABLE_BASE;
        let pin = index / 2;
        let Some(entry) = regs.entries.get_mut(pin as usize) else {
            return;
        };

        let write = if index % 2 == 0 {
            let before = entry.0;
            entry.0 = (value & !low_word_read_only(u32::MAX)) | low_word_read_only(before);
            EntryWrite {
                pin,
                half: EntryHalf::Low,
                before,
                after: entry.0,
            }
        } else {
            let before = entry.1;
            entry.1 = value & 0xFF00_0000;
            EntryWrite {
                pin,
                half: EntryHalf::High,
                before,
                after: entry.1,
            }
        };
        regs.journal.push(write);
    }
}

/// Simulated I/O APIC register window. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimIoApic {
    state: Arc<SimIoApicState>,
}

impl SimIoApic {
    /// `lines` is what the version register reports; every entry powers up
    /// masked.
    pub fn new(id: u8, lines: u8) -> Self {
        let lines = lines.max(1);
        let reset = RoutingEntry::RESET.to_words();
        Self {
            state: Arc::new(SimIoApicState {
                id,
                lines,
                regs: Mutex::new(SimRegs {
                    select: 0,
                    entries: vec![reset; lines as usize],
                    journal: Vec::new(),
                }),
            }),
        }
    }

    pub fn state(&self) -> &Arc<SimIoApicState> {
        &self.state
    }
}

impl RegisterWindow for SimIoApic {
    fn read_u32(&self, offset: u64) -> u32 {
        let regs = lock(&self.state.regs);
        match offset {
            IOREGSEL => regs.select,
            IOWIN => self.state.read_reg(&regs, regs.select),
            _ => 0,
        }
    }

    fn write_u32(&mut self, offset: u64, value: u32) {
        let mut regs = lock(&self.state.regs);
        match offset {
            IOREGSEL => regs.select = value & 0xFF,
            IOWIN => {
                let select = regs.select;
                self.state.write_reg(&mut regs, select, value);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioapic::{entry_hi, entry_lo};

    fn read(sim: &mut SimIoApic, reg: u32) -> u32 {
        sim.write_u32(IOREGSEL, reg);
        sim.read_u32(IOWIN)
    }

    fn write(sim: &mut SimIoApic, reg: u32, value: u32) {
        sim.write_u32(IOREGSEL, reg);
        sim.write_u32(IOWIN, value);
    }

    #[test]
    fn test_identity_registers() {
        let mut sim = SimIoApic::new(1, 24);
        assert_eq!(read(&mut sim, REG_ID), 1 << 24);
        assert_eq!(read(&mut sim, REG_VERSION), 0x0017_0020);
    }

    #[test]
    fn test_entries_power_up_masked() {
        let mut sim = SimIoApic::new(0, 4);
        for pin in 0..4 {
            assert_eq!(read(&mut sim, entry_lo(pin)), 1 << 16);
            assert_eq!(read(&mut sim, entry_hi(pin)), 0);
        }
        assert_eq!(read(&mut sim, entry_lo(4)), 0);
    }

    #[test]
    fn test_read_only_bits_survive_writes() {
        let mut sim = SimIoApic::new(0, 4);
        sim.state().set_status(0, 1 << 14);
        write(&mut sim, entry_lo(0), 0x30);
        assert_eq!(read(&mut sim, entry_lo(0)), 0x30 | (1 << 14));
        write(&mut sim, entry_hi(0), 0xFFFF_FFFF);
        assert_eq!(read(&mut sim, entry_hi(0)), 0xFF00_0000);
    }

    #[test]
    fn test_violation_detection() {
        let mut sim = SimIoApic::new(0, 4);
        // Masked retarget: fine.
        write(&mut sim, entry_lo(0), 0x30 | (1 << 16));
        // Unmask alone: fine.
        write(&mut sim, entry_lo(0), 0x30);
        assert!(sim.state().masked_write_violations().is_empty());
        // Retarget while live: flagged.
        write(&mut sim, entry_lo(0), 0x31);
        let violations = sim.state().masked_write_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].after, 0x31);
    }
}
