// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko

#![allow(dead_code)]

use irqcore::system::builder::{boot_simulated, SimulatedPlatform};
use irqcore::{InterruptSystem, Irq, VectorId};
use irqcore_config::{PlatformManifest, RouterConfig};

pub fn manifest(routers: &[(&str, u32, u8)]) -> PlatformManifest {
    PlatformManifest {
        schema_version: "1.0".to_string(),
        name: "test-bench".to_string(),
        vector_count: 256,
        reserved_vectors: vec![],
        boot_cpu: 0,
        imcr_present: true,
        verify_routing: false,
        routers: routers
            .iter()
            .enumerate()
            .map(|(i, &(id, base_irq, lines))| RouterConfig {
                id: id.to_string(),
                base_irq,
                register_base: 0xFEC0_0000 + (i as u64) * 0x1000,
                lines: Some(lines),
            })
            .collect(),
    }
}

pub fn boot(routers: &[(&str, u32, u8)]) -> SimulatedPlatform {
    boot_simulated(&manifest(routers)).expect("simulated platform boots")
}

pub fn vector_of(system: &InterruptSystem, irq: Irq) -> VectorId {
    system.lookup(irq).expect("irq is mapped").vector()
}
