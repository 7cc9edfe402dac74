//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate an anonymous reporter device identifier
///
/// Used when no device id is configured; stable for the process lifetime only.
pub fn generate_device_id() -> String {
    format!("device-{}", generate().simple())
}
