use super::*;

#[test]
fn parses_major_minor() {
    assert_eq!("16.4".parse(), Ok(PlatformVersion::new(16, 4)));
    assert_eq!("17".parse(), Ok(PlatformVersion::new(17, 0)));
    assert_eq!("15.7.1".parse(), Ok(PlatformVersion::new(15, 7)));
    assert!("".parse::<PlatformVersion>().is_err());
    assert!("x.1".parse::<PlatformVersion>().is_err());
}

#[test]
fn gate_compares_thresholds() {
    let gate = VersionGate {
        platform: PlatformVersion::new(15, 9),
        immersive_min: PlatformVersion::new(16, 0),
        snapshot_min: PlatformVersion::new(10, 0),
    };
    assert!(!gate.supports_immersive_scenes());
    assert!(gate.supports_snapshots());

    let gate = VersionGate { platform: PlatformVersion::new(16, 0), ..gate };
    assert!(gate.supports_immersive_scenes());
}
