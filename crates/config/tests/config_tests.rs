// IrqCore - Capability Interrupt Management Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use irqcore_config::{ConfigError, PlatformManifest, RouterConfig, MAX_IRQS};
use std::io::Write;

const Q35: &str = r#"
name: "pc-q35"
reserved_vectors: [0x80]
boot_cpu: 2
routers:
  - id: "ioapic0"
    base_irq: 0
    register_base: 0xfec00000
    lines: 24
"#;

fn router(id: &str, base_irq: u32, lines: Option<u8>) -> RouterConfig {
    RouterConfig {
        id: id.to_string(),
        base_irq,
        register_base: 0xfec0_0000,
        lines,
    }
}

fn manifest(routers: Vec<RouterConfig>) -> PlatformManifest {
    let mut m: PlatformManifest = serde_yaml::from_str(Q35).unwrap();
    m.routers = routers;
    m
}

#[test]
fn test_defaults_fill_in() {
    let m: PlatformManifest = serde_yaml::from_str(Q35).unwrap();
    assert_eq!(m.schema_version, "1.0");
    assert_eq!(m.vector_count, 256);
    assert!(m.imcr_present);
    assert!(!m.verify_routing);
    assert_eq!(m.boot_cpu, 2);
    assert_eq!(m.reserved_vectors, vec![0x80]);
    assert_eq!(m.routers[0].lines, Some(24));
    assert_eq!(m.validate(), Ok(()));
}

#[test]
fn test_lines_is_optional() {
    let yaml = r#"
name: "bare"
imcr_present: false
routers:
  - id: "ioapic0"
    base_irq: 0
    register_base: 0xfec00000
"#;
    let m: PlatformManifest = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(m.routers[0].lines, None);
    assert!(!m.imcr_present);
    assert_eq!(m.validate(), Ok(()));
}

#[test]
fn test_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(Q35.as_bytes())?;
    let m = PlatformManifest::from_file(file.path())?;
    assert_eq!(m.name, "pc-q35");
    Ok(())
}

#[test]
fn test_from_file_reports_parse_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"name: [unterminated").unwrap();
    let err = PlatformManifest::from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Platform Manifest"));
}

#[test]
fn test_router_count_is_bounded() {
    let m = manifest(vec![
        router("a", 0, Some(8)),
        router("b", 8, Some(8)),
        router("c", 16, Some(8)),
        router("d", 24, Some(8)),
    ]);
    assert_eq!(
        m.validate(),
        Err(ConfigError::TooManyRouters { count: 4, max: 3 })
    );
    assert_eq!(manifest(vec![]).validate(), Err(ConfigError::NoRouters));
}

#[test]
fn test_overlap_and_duplicates_rejected() {
    let m = manifest(vec![router("a", 0, Some(24)), router("b", 16, Some(8))]);
    assert_eq!(
        m.validate(),
        Err(ConfigError::OverlappingRouters {
            first: "a".to_string(),
            second: "b".to_string()
        })
    );

    let m = manifest(vec![router("a", 0, Some(8)), router("a", 8, Some(8))]);
    assert_eq!(m.validate(), Err(ConfigError::DuplicateRouter("a".into())));

    let m = manifest(vec![router("a", 0, Some(0))]);
    assert_eq!(m.validate(), Err(ConfigError::EmptyRouter("a".into())));

    // Unknown line counts cannot be checked for overlap until boot.
    let m = manifest(vec![router("a", 0, None), router("b", 4, Some(4))]);
    assert_eq!(m.validate(), Ok(()));
}

#[test]
fn test_vector_space_checks() {
    let mut m = manifest(vec![router("a", 0, Some(8))]);
    m.vector_count = 32;
    assert_eq!(m.validate(), Err(ConfigError::VectorCount(32)));

    m.vector_count = 64;
    m.reserved_vectors = vec![0x40];
    assert_eq!(
        m.validate(),
        Err(ConfigError::ReservedVector {
            vector: 0x40,
            count: 64
        })
    );
}

#[test]
fn test_irq_range_is_bounded() {
    let m = manifest(vec![router("a", u32::MAX - 2, Some(8))]);
    assert_eq!(
        m.validate(),
        Err(ConfigError::IrqRange {
            id: "a".into(),
            base_irq: u32::MAX - 2,
            max: MAX_IRQS
        })
    );

    let m = manifest(vec![router("a", 0, Some(8)), router("b", MAX_IRQS - 4, Some(8))]);
    assert!(matches!(m.validate(), Err(ConfigError::IrqRange { id, .. }) if id == "b"));

    let m = manifest(vec![router("a", MAX_IRQS, None)]);
    assert!(matches!(m.validate(), Err(ConfigError::IrqRange { .. })));

    // Ending exactly at the limit is fine.
    let m = manifest(vec![router("a", MAX_IRQS - 8, Some(8))]);
    assert_eq!(m.validate(), Ok(()));
}
