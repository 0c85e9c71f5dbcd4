// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{lock, PortIo};
use std::sync::{Arc, Mutex};

/// Records every port write in order. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct SimPorts {
    writes: Arc<Mutex<Vec<(u16, u8)>>>,
}

impl SimPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        lock(&self.writes).clone()
    }
}

impl PortIo for SimPorts {
    fn outb(&mut self, port: u16, value: u8) {
        lock(&self.writes).push((port, value));
    }
}
