// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! I/O APIC redirection-table driver.
//!
//! Registers are reached through an index register at the window base and a
//! data register at base + 0x10. The pair is one shared cursor, so every
//! access takes the controller's window lock for the full select-then-data
//! sequence.

pub mod entry;

pub use entry::{DeliveryMode, DestinationMode, RoutingEntry};

use crate::interrupt::InterruptController;
use crate::vector::{Irq, LineConfig, TriggerMode, VectorId};
use crate::{lock, BootError, EndOfInterrupt, RegisterWindow};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const IOREGSEL: u64 = 0x00;
pub const IOWIN: u64 = 0x10;

pub const REG_ID: u32 = 0x00;
pub const REG_VERSION: u32 = 0x01;
pub const REG_TABLE_BASE: u32 = 0x10;

pub const fn entry_lo(pin: u32) -> u32 {
    REG_TABLE_BASE + 2 * pin
}

pub const fn entry_hi(pin: u32) -> u32 {
    REG_TABLE_BASE + 2 * pin + 1
}

struct IoApicAccess<'a> {
    window: &'a mut dyn RegisterWindow,
}

impl IoApicAccess<'_> {
    fn read(&mut self, reg: u32) -> u32 {
        self.window.write_u32(IOREGSEL, reg);
        self.window.read_u32(IOWIN)
    }

    fn write(&mut self, reg: u32, value: u32) {
        self.window.write_u32(IOREGSEL, reg);
        self.window.write_u32(IOWIN, value);
    }

    fn read_entry(&mut self, pin: u32) -> RoutingEntry {
        let lo = self.read(entry_lo(pin));
        let hi = self.read(entry_hi(pin));
        RoutingEntry::from_words(lo, hi)
    }

    fn write_entry(&mut self, pin: u32, entry: RoutingEntry) {
        let (lo, hi) = entry.to_words();
        self.write(entry_lo(pin), lo);
        self.write(entry_hi(pin), hi);
    }

    fn write_low(&mut self, pin: u32, entry: RoutingEntry) {
        self.write(entry_lo(pin), entry.to_words().0);
    }
}

#[derive(Debug)]
pub struct IoApic {
    name: String,
    base_irq: Irq,
    line_count: u32,
    apic_id: u8,
    version: u8,
    window: Mutex<Box<dyn RegisterWindow>>,
    eoi: Arc<dyn EndOfInterrupt>,
}

impl IoApic {
    /// Reads identification and version registers. The line count comes from
    /// the maximum-redirection-entry field, never from configuration.
    pub fn probe(
        name: impl Into<String>,
        base_irq: Irq,
        mut window: Box<dyn RegisterWindow>,
        eoi: Arc<dyn EndOfInterrupt>,
    ) -> Self {
        let name = name.into();
        let (id, ver) = {
            let mut io = IoApicAccess {
                window: window.as_mut(),
            };
            (io.read(REG_ID), io.read(REG_VERSION))
        };
        let apic_id = ((id >> 24) & 0x0F) as u8;
        let version = (ver & 0xFF) as u8;
        let line_count = ((ver >> 16) & 0xFF) + 1;

        info!(
            "[IOAPIC] {}: id {}, version {:#x}, IRQs {}..{}",
            name,
            apic_id,
            version,
            base_irq,
            base_irq.saturating_add(line_count)
        );

        Self {
            name,
            base_irq,
            line_count,
            apic_id,
            version,
            window: Mutex::new(window),
            eoi,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_irq(&self) -> Irq {
        self.base_irq
    }

    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    pub fn apic_id(&self) -> u8 {
        self.apic_id
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    fn access<R>(&self, f: impl FnOnce(&mut IoApicAccess<'_>) -> R) -> R {
        let mut window = lock(&self.window);
        let mut io = IoApicAccess {
            window: window.as_mut(),
        };
        f(&mut io)
    }

    /// Current routing entry of a local line.
    pub fn entry(&self, pin: u32) -> RoutingEntry {
        self.access(|io| io.read_entry(pin))
    }

    /// Read-modify-write of one entry.
    ///
    /// When vector, polarity or trigger change, the router only ever sees the
    /// new values with the mask bit set; an unmasked line is masked first and
    /// the requested mask state is restored last.
    fn reprogram(&self, pin: u32, update: impl FnOnce(&mut RoutingEntry)) -> RoutingEntry {
        self.access(|io| {
            let old = io.read_entry(pin);
            let mut new = old;
            update(&mut new);
            if new == old {
                return new;
            }

            if old.delivery_changes(&new) {
                if !old.masked {
                    io.write_low(pin, old.masked());
                }
                io.write_entry(pin, new.masked());
                if !new.masked {
                    io.write_low(pin, new);
                }
            } else {
                io.write_entry(pin, new);
            }
            debug!(
                "[IOAPIC] {} pin {}: vector {:#04x} masked {} -> vector {:#04x} masked {}",
                self.name, pin, old.vector, old.masked, new.vector, new.masked
            );
            new
        })
    }

    /// Wires a line to its vector: fixed delivery, physical destination,
    /// masked. Polarity and trigger are left alone until `setup`.
    pub fn route(&self, line: &LineConfig, destination: u8) -> RoutingEntry {
        let vector = line.vector.raw();
        self.reprogram(line.pin, |e| {
            e.vector = vector;
            e.delivery = DeliveryMode::Fixed;
            e.destination_mode = DestinationMode::Physical;
            e.masked = true;
            e.destination = destination;
        })
    }

    /// Reads an entry back and compares it with what was just written.
    pub fn verify(
        &self,
        vector: VectorId,
        pin: u32,
        expected: &RoutingEntry,
    ) -> Result<(), BootError> {
        let readback = self.entry(pin);
        if readback.to_words() != expected.to_words() {
            return Err(BootError::RoutingMismatch {
                vector,
                readback: readback.vector,
            });
        }
        Ok(())
    }
}

impl InterruptController for IoApic {
    fn setup(&self, line: &LineConfig) {
        assert!(
            line.signal.is_resolved(),
            "setup of vector {} (IRQ {}) with an unresolved signal",
            line.vector,
            line.irq
        );
        let trigger = line.signal.trigger();
        let polarity = line.signal.polarity();
        self.reprogram(line.pin, |e| {
            e.trigger = trigger;
            e.polarity = polarity;
        });
    }

    fn enable(&self, line: &LineConfig) {
        self.reprogram(line.pin, |e| e.masked = false);
    }

    fn disable(&self, line: &LineConfig) {
        self.reprogram(line.pin, |e| e.masked = true);
    }

    /// The local APIC offers no way to observe de-assertion, so this only
    /// reports whether the line is enabled.
    fn is_pending(&self, line: &LineConfig) -> bool {
        line.enabled
    }

    fn early_ack(&self, line: &LineConfig) {
        if line.signal.trigger() == TriggerMode::Edge {
            debug!("[IOAPIC] early EOI for IRQ {}", line.irq);
            self.eoi.signal_eoi();
        }
    }

    fn late_ack(&self, line: &LineConfig) {
        if line.signal.trigger() == TriggerMode::Level {
            debug!("[IOAPIC] late EOI for IRQ {}", line.irq);
            self.eoi.signal_eoi();
        }
    }
}
