use std::path::PathBuf;

use pmbus_core::{
    BusConfig, CommandTable, DeviceRegistry, MemoryTransport, Reading, SessionError, TableError,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn config_builds_builtin_and_generic_devices() {
    let config = BusConfig::from_path(&fixture("bus.json")).unwrap();
    let mut bus = config
        .build_bus(&DeviceRegistry::with_builtin(), MemoryTransport::new)
        .unwrap();
    assert_eq!(bus.addresses().collect::<Vec<_>>(), vec![0x29, 0x30]);

    // the generic device's table was found next to the config file
    let custom = bus.get_mut(0x30).unwrap();
    custom.write_value("MFR_FAN_SPEED", -12.0).unwrap();
    assert_eq!(custom.read("MFR_FAN_SPEED").unwrap(), Reading::Value(-12.0));

    let brick = bus.get_mut(0x29).unwrap();
    assert!(brick.table().get("MFR_FAN_SPEED").is_err());
    brick.write_value("VOUT_COMMAND", 12.0).unwrap();
    brick.write_bytes("CLEAR_FAULTS", &[]).unwrap();
    let writes = brick.transport().writes();
    assert_eq!(writes[0].data, vec![0x00, 0x18]);
    assert_eq!(writes[1].register, 0x03);
}

#[test]
fn brick_telemetry_decodes_signed_readings() {
    let config = BusConfig::from_path(&fixture("bus.json")).unwrap();
    let mut bus = config
        .build_bus(&DeviceRegistry::with_builtin(), MemoryTransport::new)
        .unwrap();
    let brick = bus.get_mut(0x29).unwrap();

    // READ_TEMPERATURE_1: exponent -2 (0b11110), mantissa -20 -> -5.0 degrees
    let word: u16 = (0b11110 << 11) | (0x7FF & (-20i16 as u16));
    brick
        .transport_mut()
        .set_register(0x8D, &word.to_le_bytes());
    assert_eq!(brick.read_value("READ_TEMPERATURE_1").unwrap(), -5.0);
}

#[test]
fn malformed_fixture_reports_line_and_command() {
    let err = CommandTable::open(&fixture("malformed.csv")).unwrap_err();
    assert!(matches!(err, TableError::Row { line: 3, .. }));
    let message = err.to_string();
    assert!(message.contains("malformed.csv:3:"), "{message}");
    assert!(message.contains("VOUT_COMMAND"), "{message}");
}

#[test]
fn session_errors_name_the_command() {
    let config = BusConfig::from_path(&fixture("bus.json")).unwrap();
    let mut bus = config
        .build_bus(&DeviceRegistry::with_builtin(), MemoryTransport::new)
        .unwrap();
    let custom = bus.get_mut(0x30).unwrap();
    let err = custom.write_value("READ_VOUT", 1.0).unwrap_err();
    assert!(matches!(err, SessionError::WriteNotPermitted { .. }));
    assert_eq!(err.to_string(), "READ_VOUT is not write accessible");
}
