// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use irqcore::snapshot::SystemSnapshot;
use irqcore::system::builder::{boot_simulated, SimulatedPlatform};
use irqcore_config::PlatformManifest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_OK: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_BOOT_FAILURE: u8 = 3;

const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Boots the interrupt core against a simulated platform",
    long_about = None
)]
struct Cli {
    /// Path to the platform manifest (YAML)
    #[arg(short, long)]
    platform: PathBuf,

    /// Write the post-boot interrupt state (JSON)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log every register write, unmask and wake
    #[arg(short, long)]
    trace: bool,
}

#[derive(Serialize, Debug)]
struct SnapshotFile<'a> {
    schema_version: &'static str,
    platform: &'a str,
    mode_port_writes: Vec<(u16, u8)>,
    system: SystemSnapshot,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    ExitCode::from(run(&cli))
}

fn run(cli: &Cli) -> u8 {
    let manifest = match load_manifest(&cli.platform) {
        Ok(m) => m,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let platform = match boot_simulated(&manifest) {
        Ok(p) => p,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_BOOT_FAILURE;
        }
    };

    print_vector_map(&platform);

    if let Some(path) = &cli.snapshot {
        if let Err(e) = write_snapshot(path, &manifest, &platform) {
            error!("{:#}", e);
            return EXIT_BOOT_FAILURE;
        }
        info!("Snapshot written to {:?}", path);
    }

    EXIT_OK
}

fn load_manifest(path: &Path) -> anyhow::Result<PlatformManifest> {
    info!("Loading platform manifest: {:?}", path);
    let manifest = PlatformManifest::from_file(path)?;
    manifest.validate()?;
    Ok(manifest)
}

fn print_vector_map(platform: &SimulatedPlatform) {
    let mut map: Vec<_> = platform
        .system
        .table()
        .lines()
        .map(|line| (line.irq(), line.vector()))
        .collect();
    map.sort();
    for (irq, vector) in map {
        println!("IRQ {} -> vector {}", irq, vector);
    }
}

fn write_snapshot(
    path: &Path,
    manifest: &PlatformManifest,
    platform: &SimulatedPlatform,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let file = SnapshotFile {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        platform: &manifest.name,
        mode_port_writes: platform.ports.writes(),
        system: platform.system.snapshot(),
    };
    let f = std::fs::File::create(path)
        .with_context(|| format!("Failed to create snapshot {:?}", path))?;
    serde_json::to_writer_pretty(f, &file)
        .with_context(|| format!("Failed to write snapshot {:?}", path))?;
    Ok(())
}
