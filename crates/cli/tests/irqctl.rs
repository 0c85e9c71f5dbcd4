// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn platform(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs/platforms")
        .join(name)
}

#[test]
#[allow(deprecated)]
fn test_prints_vector_map() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(platform("pc-q35.yaml"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("IRQ 0 -> vector 0x20"))
        .stdout(predicate::str::contains("IRQ 23 -> vector 0x37"))
        .stdout(predicate::str::contains("IRQ 24").not());
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_second_router_follows_first() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(platform("dual-ioapic.yaml"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("IRQ 24 -> vector 0x38"))
        .stdout(predicate::str::contains("IRQ 55 -> vector 0x57"));
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_writes_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("snapshot.json");

    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform")
        .arg(platform("pc-q35.yaml"))
        .arg("--snapshot")
        .arg(&out);
    cmd.assert().success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(json["schema_version"], "1.0");
    assert_eq!(json["platform"], "pc-q35");
    assert_eq!(json["system"]["irq_count"], 24);
    assert_eq!(json["system"]["controllers"][0]["name"], "ioapic0");
    assert_eq!(json["mode_port_writes"][0][0], 0x22);
    assert_eq!(json["mode_port_writes"][0][1], 0x70);
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_missing_manifest_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(dir.path().join("nope.yaml"));
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to open platform manifest"));
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_invalid_manifest_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("four.yaml");
    let mut yaml = String::from("name: \"too-many\"\nrouters:\n");
    for i in 0..4 {
        yaml.push_str(&format!(
            "  - id: \"r{i}\"\n    base_irq: {}\n    register_base: 0xfec0{i}000\n    lines: 8\n",
            i * 8
        ));
    }
    fs::write(&path, yaml)?;

    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(&path);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("at most 3"));
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_irq_range_overflow_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("far.yaml");
    fs::write(
        &path,
        "name: \"far\"\nrouters:\n  - id: \"ioapic0\"\n    base_irq: 4294967293\n    register_base: 0xfec00000\n    lines: 8\n",
    )?;

    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(&path);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("beyond the limit of 256"));
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_vector_exhaustion_is_boot_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("small.yaml");
    fs::write(
        &path,
        "name: \"small\"\nvector_count: 40\nrouters:\n  - id: \"ioapic0\"\n    base_irq: 0\n    register_base: 0xfec00000\n    lines: 24\n",
    )?;

    let mut cmd = Command::cargo_bin("irqctl")?;
    cmd.arg("--platform").arg(&path);
    cmd.assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No free vector left for IRQ 8"));
    Ok(())
}
