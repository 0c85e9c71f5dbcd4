// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod builder;

use crate::interrupt::{ControllerId, ControllerRegistry, InterruptController};
use crate::ioapic::IoApic;
use crate::snapshot::{ControllerSnapshot, LineSnapshot, SystemSnapshot, VectorSnapshot};
use crate::vector::{
    InterruptLine, Irq, LineConfig, LineSignal, Polarity, TriggerMode, VectorKind, VectorTable,
    VectorTableBuilder,
};
use crate::{mode, BootError, EndOfInterrupt, LookupError, PortIo, RegisterWindow};
use irqcore_config::{PlatformManifest, EXCEPTION_VECTORS, MAX_IRQS, MAX_VECTORS};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOptions {
    pub vector_count: u16,
    /// Vectors withheld from device lines besides the CPU exceptions.
    pub reserved_vectors: Vec<u16>,
    /// Destination written into every routing entry.
    pub boot_cpu: u8,
    /// Perform the legacy-to-advanced delivery handshake.
    pub enter_advanced_mode: bool,
    /// Read back every routing entry after it is programmed.
    pub verify_routing: bool,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            vector_count: MAX_VECTORS,
            reserved_vectors: Vec::new(),
            boot_cpu: 0,
            enter_advanced_mode: true,
            verify_routing: false,
        }
    }
}

impl From<&PlatformManifest> for BootOptions {
    fn from(manifest: &PlatformManifest) -> Self {
        Self {
            vector_count: manifest.vector_count,
            reserved_vectors: manifest.reserved_vectors.clone(),
            boot_cpu: manifest.boot_cpu,
            enter_advanced_mode: manifest.imcr_present,
            verify_routing: manifest.verify_routing,
        }
    }
}

#[derive(Debug)]
struct PendingRouter {
    name: String,
    base_irq: Irq,
    window: Box<dyn RegisterWindow>,
}

/// Boot phase of the interrupt subsystem. Consumed by [`boot`](Self::boot),
/// which hands back the immutable [`InterruptSystem`].
#[derive(Debug)]
pub struct InterruptSystemBuilder {
    options: BootOptions,
    routers: Vec<PendingRouter>,
}

impl InterruptSystemBuilder {
    pub fn new(options: BootOptions) -> Self {
        Self {
            options,
            routers: Vec::new(),
        }
    }

    /// Registers a router found by platform discovery. Its line count is not
    /// known until `boot` probes it.
    pub fn add_router(
        &mut self,
        name: impl Into<String>,
        base_irq: Irq,
        window: Box<dyn RegisterWindow>,
    ) -> Result<&mut Self, BootError> {
        if self.routers.len() == crate::MAX_CONTROLLERS {
            return Err(BootError::TooManyControllers {
                capacity: crate::MAX_CONTROLLERS,
            });
        }
        self.routers.push(PendingRouter {
            name: name.into(),
            base_irq,
            window,
        });
        Ok(self)
    }

    pub fn boot(
        self,
        ports: &mut dyn PortIo,
        eoi: Arc<dyn EndOfInterrupt>,
    ) -> Result<InterruptSystem, BootError> {
        let options = self.options;
        let mut vectors = VectorTableBuilder::new(options.vector_count as usize);
        for v in 0..EXCEPTION_VECTORS {
            vectors.reserve(v as u8);
        }
        for &v in &options.reserved_vectors {
            if let Ok(v) = u8::try_from(v) {
                vectors.reserve(v);
            }
        }

        let mut registry = ControllerRegistry::new();
        let mut routers: Vec<Arc<IoApic>> = Vec::new();

        for pending in self.routers {
            let router = Arc::new(IoApic::probe(
                pending.name,
                pending.base_irq,
                pending.window,
                eoi.clone(),
            ));
            let end = router.base_irq().checked_add(router.line_count());
            if end.map_or(true, |end| end > MAX_IRQS) {
                return Err(BootError::IrqRange {
                    base_irq: router.base_irq(),
                    line_count: router.line_count(),
                });
            }
            let id = registry.register(
                router.name(),
                router.base_irq(),
                router.line_count(),
                router.clone(),
            )?;
            vectors.note_irq_range(router.base_irq(), router.line_count());

            for pin in 0..router.line_count() {
                let vector = vectors.allocate_vector(id, router.base_irq(), pin)?;
                router.disable(&LineConfig {
                    vector,
                    irq: router.base_irq() + pin,
                    pin,
                    signal: LineSignal::FromBus,
                    enabled: false,
                });
            }
            routers.push(router);
        }

        if options.enter_advanced_mode {
            mode::enter_advanced_mode(ports);
        }

        let table = vectors.build();
        for line in table.lines() {
            let router = &routers[line.controller().index()];
            let config = line.lock().config();
            debug_assert!(!config.enabled);

            let programmed = router.route(&config, options.boot_cpu);
            if options.verify_routing {
                router.verify(config.vector, config.pin, &programmed)?;
            }
            debug!("Vector {} -> IRQ {}", config.vector, config.irq);
        }

        info!(
            "Interrupt routing up: {} router(s), {} IRQs",
            registry.len(),
            table.irq_count()
        );

        Ok(InterruptSystem { registry, table })
    }
}

/// The booted interrupt subsystem. Shape is fixed; only per-line state moves.
#[derive(Debug)]
pub struct InterruptSystem {
    registry: ControllerRegistry,
    table: VectorTable,
}

impl InterruptSystem {
    pub fn table(&self) -> &VectorTable {
        &self.table
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn irq_count(&self) -> Irq {
        self.table.irq_count()
    }

    pub fn lookup(&self, irq: Irq) -> Result<InterruptLine<'_>, LookupError> {
        self.table.lookup(irq)
    }

    pub fn controller(&self, id: ControllerId) -> &dyn InterruptController {
        self.registry[id].controller()
    }

    /// Records a line's real trigger mode and polarity and programs the router.
    pub fn configure_line(
        &self,
        irq: Irq,
        trigger: TriggerMode,
        polarity: Polarity,
    ) -> Result<(), LookupError> {
        let line = self.lookup(irq)?;
        let controller = self.controller(line.controller());
        let mut guard = line.lock();
        guard.set_signal(trigger, polarity);
        controller.setup(&guard.config());
        debug!("IRQ {} configured {:?} {:?}", irq, trigger, polarity);
        Ok(())
    }

    /// Unmasks a line at its router. A later `wait` finds it already armed.
    pub fn enable_irq(&self, irq: Irq) -> Result<(), LookupError> {
        let line = self.lookup(irq)?;
        let controller = self.controller(line.controller());
        let mut guard = line.lock();
        guard.arm();
        controller.enable(&guard.config());
        Ok(())
    }

    /// Masks a line at its router. The next `wait` unmasks it again.
    pub fn disable_irq(&self, irq: Irq) -> Result<(), LookupError> {
        let line = self.lookup(irq)?;
        let controller = self.controller(line.controller());
        let mut guard = line.lock();
        guard.disarm();
        controller.disable(&guard.config());
        Ok(())
    }

    pub fn is_irq_pending(&self, irq: Irq) -> Result<bool, LookupError> {
        let line = self.lookup(irq)?;
        let config = line.lock().config();
        Ok(self.controller(line.controller()).is_pending(&config))
    }

    /// Refused: see [`mode::revert_to_legacy_mode`].
    pub fn shutdown(&self, ports: &mut dyn PortIo) -> Result<(), BootError> {
        mode::revert_to_legacy_mode(ports)
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        let controllers = self
            .registry
            .iter()
            .map(|(id, slot)| ControllerSnapshot {
                id,
                name: slot.name.clone(),
                base_irq: slot.base_irq,
                line_count: slot.line_count,
            })
            .collect();

        let vectors = self
            .table
            .entries()
            .filter(|e| e.kind() != VectorKind::Unbound)
            .map(|e| VectorSnapshot {
                vector: e.id(),
                kind: e.kind(),
                line: e.line().map(|line| {
                    let guard = line.lock();
                    LineSnapshot {
                        irq: line.irq(),
                        controller: line.controller(),
                        pin: line.pin(),
                        signal: guard.signal(),
                        enabled: guard.is_enabled(),
                        pending: guard.is_pending(),
                        unmasked: guard.is_unmasked(),
                        waiters: guard.waiters().collect(),
                        granted: guard.granted(),
                        behavior: guard.behavior(),
                    }
                }),
            })
            .collect();

        SystemSnapshot {
            irq_count: self.irq_count(),
            controllers,
            vectors,
        }
    }
}
