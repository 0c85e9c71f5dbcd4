// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{BootOptions, InterruptSystem, InterruptSystemBuilder};
use crate::sim::{SimIoApic, SimIoApicState, SimLapic, SimPorts};
use anyhow::Context;
use irqcore_config::PlatformManifest;
use std::sync::Arc;
use tracing::info;

/// Lines reported by a simulated router whose manifest entry leaves `lines` out.
pub const DEFAULT_SIM_LINES: u8 = 24;

/// A booted interrupt system wired to simulated hardware, plus handles on
/// that hardware for inspection.
#[derive(Debug)]
pub struct SimulatedPlatform {
    pub system: Arc<InterruptSystem>,
    pub routers: Vec<Arc<SimIoApicState>>,
    pub ports: SimPorts,
    pub lapic: Arc<SimLapic>,
}

/// Boots the interrupt subsystem against simulated routers described by a
/// platform manifest.
pub fn boot_simulated(manifest: &PlatformManifest) -> anyhow::Result<SimulatedPlatform> {
    manifest.validate()?;

    let lapic = Arc::new(SimLapic::new());
    let mut ports = SimPorts::new();
    let mut builder = InterruptSystemBuilder::new(BootOptions::from(manifest));
    let mut routers = Vec::with_capacity(manifest.routers.len());

    for (index, router) in manifest.routers.iter().enumerate() {
        let sim = SimIoApic::new(index as u8, router.lines.unwrap_or(DEFAULT_SIM_LINES));
        info!(
            "Simulating router '{}' at {:#x} from IRQ {}",
            router.id, router.register_base, router.base_irq
        );
        routers.push(sim.state().clone());
        builder.add_router(router.id.as_str(), router.base_irq, Box::new(sim))?;
    }

    let system = builder
        .boot(&mut ports, lapic.clone())
        .with_context(|| format!("Interrupt subsystem of '{}' failed to boot", manifest.name))?;

    Ok(SimulatedPlatform {
        system: Arc::new(system),
        routers,
        ports,
        lapic,
    })
}
