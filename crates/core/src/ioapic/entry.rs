// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Redirection-table entry layout.
//!
//! Low word:
//! `[7:0]` vector, `[10:8]` delivery mode, `[11]` destination mode,
//! `[12]` delivery status (RO), `[13]` polarity, `[14]` remote IRR (RO),
//! `[15]` trigger mode, `[16]` mask.
//! High word: `[31:24]` destination.

use crate::vector::{Polarity, TriggerMode};
use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct LowFlags: u32 {
        const DEST_LOGICAL = 1 << 11;
        const SEND_PENDING = 1 << 12;
        const ACTIVE_LOW = 1 << 13;
        const REMOTE_IRR = 1 << 14;
        const LEVEL = 1 << 15;
        const MASKED = 1 << 16;
    }
}

const VECTOR_MASK: u32 = 0xFF;
const DELIVERY_SHIFT: u32 = 8;
const DELIVERY_MASK: u32 = 0x7;
const DEST_SHIFT: u32 = 24;

/// Read-only bits, ignored on write.
const READ_ONLY: LowFlags = LowFlags::SEND_PENDING.union(LowFlags::REMOTE_IRR);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Fixed,
    LowestPriority,
    Smi,
    Nmi,
    Init,
    ExtInt,
    Reserved(u8),
}

impl DeliveryMode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => DeliveryMode::Fixed,
            1 => DeliveryMode::LowestPriority,
            2 => DeliveryMode::Smi,
            4 => DeliveryMode::Nmi,
            5 => DeliveryMode::Init,
            7 => DeliveryMode::ExtInt,
            other => DeliveryMode::Reserved(other),
        }
    }

    fn bits(self) -> u8 {
        match self {
            DeliveryMode::Fixed => 0,
            DeliveryMode::LowestPriority => 1,
            DeliveryMode::Smi => 2,
            DeliveryMode::Nmi => 4,
            DeliveryMode::Init => 5,
            DeliveryMode::ExtInt => 7,
            DeliveryMode::Reserved(bits) => bits & DELIVERY_MASK as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationMode {
    Physical,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingEntry {
    pub vector: u8,
    pub delivery: DeliveryMode,
    pub destination_mode: DestinationMode,
    pub polarity: Polarity,
    pub trigger: TriggerMode,
    pub masked: bool,
    pub destination: u8,
    /// Delivery status, read only.
    pub send_pending: bool,
    /// Remote IRR, read only.
    pub remote_irr: bool,
}

impl RoutingEntry {
    /// Power-on state of every entry.
    pub const RESET: RoutingEntry = RoutingEntry {
        vector: 0,
        delivery: DeliveryMode::Fixed,
        destination_mode: DestinationMode::Physical,
        polarity: Polarity::ActiveHigh,
        trigger: TriggerMode::Edge,
        masked: true,
        destination: 0,
        send_pending: false,
        remote_irr: false,
    };

    pub(crate) fn from_words(lo: u32, hi: u32) -> Self {
        let flags = LowFlags::from_bits_truncate(lo);
        Self {
            vector: (lo & VECTOR_MASK) as u8,
            delivery: DeliveryMode::from_bits(((lo >> DELIVERY_SHIFT) & DELIVERY_MASK) as u8),
            destination_mode: if flags.contains(LowFlags::DEST_LOGICAL) {
                DestinationMode::Logical
            } else {
                DestinationMode::Physical
            },
            polarity: if flags.contains(LowFlags::ACTIVE_LOW) {
                Polarity::ActiveLow
            } else {
                Polarity::ActiveHigh
            },
            trigger: if flags.contains(LowFlags::LEVEL) {
                TriggerMode::Level
            } else {
                TriggerMode::Edge
            },
            masked: flags.contains(LowFlags::MASKED),
            destination: (hi >> DEST_SHIFT) as u8,
            send_pending: flags.contains(LowFlags::SEND_PENDING),
            remote_irr: flags.contains(LowFlags::REMOTE_IRR),
        }
    }

    /// Encodes the writable fields. Read-only status bits are never written.
    pub(crate) fn to_words(self) -> (u32, u32) {
        let mut flags = LowFlags::empty();
        flags.set(
            LowFlags::DEST_LOGICAL,
            self.destination_mode == DestinationMode::Logical,
        );
        flags.set(LowFlags::ACTIVE_LOW, self.polarity == Polarity::ActiveLow);
        flags.set(LowFlags::LEVEL, self.trigger == TriggerMode::Level);
        flags.set(LowFlags::MASKED, self.masked);

        let lo = self.vector as u32
            | ((self.delivery.bits() as u32) << DELIVERY_SHIFT)
            | (flags - READ_ONLY).bits();
        let hi = (self.destination as u32) << DEST_SHIFT;
        (lo, hi)
    }

    /// Whether moving from `self` to `next` changes where or how the line is
    /// delivered, which the router must only see while the line is masked.
    pub fn delivery_changes(&self, next: &RoutingEntry) -> bool {
        self.vector != next.vector
            || self.polarity != next.polarity
            || self.trigger != next.trigger
    }

    /// Same entry with the mask bit set.
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }
}

/// Raw low-word bit tests used by the hardware model.
pub(crate) fn low_word_masked(lo: u32) -> bool {
    LowFlags::from_bits_truncate(lo).contains(LowFlags::MASKED)
}

/// Raw low-word read-only bits.
pub(crate) fn low_word_read_only(lo: u32) -> u32 {
    lo & READ_ONLY.bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_layout() {
        let e = RoutingEntry {
            vector: 0x31,
            delivery: DeliveryMode::Fixed,
            destination_mode: DestinationMode::Physical,
            polarity: Polarity::ActiveLow,
            trigger: TriggerMode::Level,
            masked: true,
            destination: 3,
            send_pending: false,
            remote_irr: false,
        };
        let (lo, hi) = e.to_words();
        assert_eq!(lo, 0x31 | (1 << 13) | (1 << 15) | (1 << 16));
        assert_eq!(hi, 0x0300_0000);
        assert_eq!(RoutingEntry::from_words(lo, hi), e);
    }

    #[test]
    fn test_read_only_bits_decode_but_never_encode() {
        let lo = 0x40 | (1 << 12) | (1 << 14) | (1 << 11) | (1 << 8);
        let e = RoutingEntry::from_words(lo, 0);
        assert!(e.send_pending);
        assert!(e.remote_irr);
        assert_eq!(e.destination_mode, DestinationMode::Logical);
        assert_eq!(e.delivery, DeliveryMode::LowestPriority);

        let (lo2, _) = e.to_words();
        assert_eq!(lo2 & ((1 << 12) | (1 << 14)), 0);
        assert_eq!(lo2, 0x40 | (1 << 11) | (1 << 8));
    }

    #[test]
    fn test_reserved_delivery_mode_is_kept() {
        let e = RoutingEntry::from_words(3 << 8, 0);
        assert_eq!(e.delivery, DeliveryMode::Reserved(3));
        assert_eq!(e.to_words().0, 3 << 8);
    }

    #[test]
    fn test_reset_entry_is_masked() {
        let (lo, hi) = RoutingEntry::RESET.to_words();
        assert_eq!((lo, hi), (1 << 16, 0));
        assert!(low_word_masked(lo));
    }

    #[test]
    fn test_delivery_changes() {
        let base = RoutingEntry::RESET;
        let mut moved = base;
        moved.destination = 7;
        moved.masked = false;
        assert!(!base.delivery_changes(&moved));

        moved.vector = 0x40;
        assert!(base.delivery_changes(&moved));

        let mut flipped = base;
        flipped.polarity = Polarity::ActiveLow;
        assert!(base.delivery_changes(&flipped));
    }
}
