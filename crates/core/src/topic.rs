//! Topic naming for device telemetry: `devices/{deviceId}/data`.

/// Default subscription filter covering every device.
pub const DEVICE_DATA_FILTER: &str = "devices/+/data";

/// Extract the device id from a `devices/{deviceId}/data` topic.
///
/// Returns `None` for topics outside that namespace.
pub fn device_id_from_topic(topic: &str) -> Option<&str> {
    let rest = topic.strip_prefix("devices/")?;
    let device_id = rest.strip_suffix("/data")?;
    if device_id.is_empty() || device_id.contains('/') {
        return None;
    }
    Some(device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_device_id() {
        assert_eq!(
            device_id_from_topic("devices/StromWater_Device_1/data"),
            Some("StromWater_Device_1")
        );
    }

    #[test]
    fn rejects_foreign_topics() {
        assert_eq!(device_id_from_topic("devices//data"), None);
        assert_eq!(device_id_from_topic("devices/a/b/data"), None);
        assert_eq!(device_id_from_topic("sensors/a/data"), None);
        assert_eq!(device_id_from_topic("devices/a/status"), None);
    }
}
