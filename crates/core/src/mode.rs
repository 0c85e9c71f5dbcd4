// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Interrupt Mode Control Register handshake.
//!
//! Chipsets following the MP specification route device lines either to the
//! legacy 8259 pair or to the I/O APICs. Writing 0x70 to port 0x22 selects
//! the mode register; the following write to port 0x23 picks the mode.

use crate::{BootError, PortIo};
use tracing::{error, info};

pub const IMCR_SELECT: u16 = 0x22;
pub const IMCR_DATA: u16 = 0x23;
pub const IMCR_SET_INTERRUPT_MODE: u8 = 0x70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeliveryModel {
    Legacy = 0,
    Advanced = 1,
}

/// Moves device interrupt delivery from the legacy controllers to the
/// redirection-table routers.
pub fn enter_advanced_mode(ports: &mut dyn PortIo) {
    info!("Switching interrupt delivery to advanced routing");
    ports.outb(IMCR_SELECT, IMCR_SET_INTERRUPT_MODE);
    ports.outb(IMCR_DATA, DeliveryModel::Advanced as u8);
}

/// Going back to legacy delivery has no known-good protocol: the local units
/// would have to be quiesced first. Always refused, and the ports are left
/// untouched.
pub fn revert_to_legacy_mode(_ports: &mut dyn PortIo) -> Result<(), BootError> {
    error!("Do not know how to leave advanced interrupt routing");
    Err(BootError::ShutdownUnsupported)
}
