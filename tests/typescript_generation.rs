//! TypeScript Generation Tests
//!
//! Validates that sensorhub types can be exported to TypeScript when the
//! tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, every exported type is configured for TypeScript.
    fn assert_type<T: Type>() {}

    assert_type::<sensorhub::SensorReading>();
    assert_type::<sensorhub::PacketHeader>();
    assert_type::<sensorhub::Command>();
    assert_type::<sensorhub::Heartbeat>();
    assert_type::<sensorhub::BleBoxing>();
    assert_type::<sensorhub::HubConfig>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still build without specta::Type
    let _ = sensorhub::HubConfig::default();
}
