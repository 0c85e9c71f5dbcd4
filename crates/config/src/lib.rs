// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Fixed capacity of the routing controller registry.
pub const MAX_ROUTERS: usize = 3;

/// Vectors below this number are CPU exceptions and never carry device IRQs.
pub const EXCEPTION_VECTORS: u16 = 32;

/// Size of the hardware vector space.
pub const MAX_VECTORS: u16 = 256;

/// Global IRQ numbers are below this. The vector space could not serve more.
pub const MAX_IRQS: u32 = MAX_VECTORS as u32;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_vector_count() -> u16 {
    MAX_VECTORS
}

fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("platform declares no interrupt routers")]
    NoRouters,
    #[error("platform declares {count} routers, at most {max} are supported")]
    TooManyRouters { count: usize, max: usize },
    #[error("router id '{0}' is declared twice")]
    DuplicateRouter(String),
    #[error("vector_count {0} is outside 33..=256")]
    VectorCount(u16),
    #[error("reserved vector {vector:#x} is outside the vector space of {count}")]
    ReservedVector { vector: u16, count: u16 },
    #[error("routers '{first}' and '{second}' serve overlapping IRQ ranges")]
    OverlappingRouters { first: String, second: String },
    #[error("router '{0}' declares zero lines")]
    EmptyRouter(String),
    #[error("router '{id}' serves IRQs from {base_irq}, beyond the limit of {max}")]
    IrqRange { id: String, base_irq: u32, max: u32 },
}

/// One I/O APIC style redirection-table device.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub id: String,
    /// First global IRQ number served by this router.
    pub base_irq: u32,
    /// Physical address of the index/data register window.
    pub register_base: u64,
    /// Line count reported by simulated hardware. Real hardware reports its
    /// own count through the version register and ignores this field.
    #[serde(default)]
    pub lines: Option<u8>,
}

impl RouterConfig {
    /// Global IRQs served, when the line count is declared. `None` also when
    /// the range does not fit in `u32`.
    fn irq_range(&self) -> Option<std::ops::Range<u32>> {
        let lines = self.lines?;
        let end = self.base_irq.checked_add(lines as u32)?;
        Some(self.base_irq..end)
    }

    fn exceeds_irq_space(&self) -> bool {
        match self.lines {
            Some(_) => self.irq_range().map_or(true, |r| r.end > MAX_IRQS),
            None => self.base_irq >= MAX_IRQS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlatformManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default = "default_vector_count")]
    pub vector_count: u16,
    /// Vectors kept away from device IRQs, in addition to the CPU exceptions.
    #[serde(default)]
    pub reserved_vectors: Vec<u16>,
    /// Destination id written into every routing entry at boot.
    #[serde(default)]
    pub boot_cpu: u8,
    /// Whether the chipset needs the interrupt-mode handshake to leave
    /// legacy delivery.
    #[serde(default = "default_true")]
    pub imcr_present: bool,
    /// Read back each routing entry after programming it.
    #[serde(default)]
    pub verify_routing: bool,
    pub routers: Vec<RouterConfig>,
}

impl PlatformManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("Failed to open platform manifest {:?}", path))?;
        let manifest: Self =
            serde_yaml::from_reader(f).context("Failed to parse Platform Manifest")?;
        tracing::debug!(
            "Loaded platform '{}' with {} router(s)",
            manifest.name,
            manifest.routers.len()
        );
        Ok(manifest)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.routers.is_empty() {
            return Err(ConfigError::NoRouters);
        }
        if self.routers.len() > MAX_ROUTERS {
            return Err(ConfigError::TooManyRouters {
                count: self.routers.len(),
                max: MAX_ROUTERS,
            });
        }
        if self.vector_count <= EXCEPTION_VECTORS || self.vector_count > MAX_VECTORS {
            return Err(ConfigError::VectorCount(self.vector_count));
        }
        if let Some(&vector) = self
            .reserved_vectors
            .iter()
            .find(|&&v| v >= self.vector_count)
        {
            return Err(ConfigError::ReservedVector {
                vector,
                count: self.vector_count,
            });
        }

        let mut seen = HashSet::new();
        for router in &self.routers {
            if !seen.insert(router.id.as_str()) {
                return Err(ConfigError::DuplicateRouter(router.id.clone()));
            }
            if router.lines == Some(0) {
                return Err(ConfigError::EmptyRouter(router.id.clone()));
            }
            if router.exceeds_irq_space() {
                return Err(ConfigError::IrqRange {
                    id: router.id.clone(),
                    base_irq: router.base_irq,
                    max: MAX_IRQS,
                });
            }
        }

        for (i, first) in self.routers.iter().enumerate() {
            let Some(a) = first.irq_range() else {
                continue;
            };
            for second in &self.routers[i + 1..] {
                let Some(b) = second.irq_range() else {
                    continue;
                };
                if a.start < b.end && b.start < a.end {
                    return Err(ConfigError::OverlappingRouters {
                        first: first.id.clone(),
                        second: second.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
