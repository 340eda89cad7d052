//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

/// Project file looked up in the project root.
pub const CONFIG_FILE: &str = "vizbuilder.toml";

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        3456
    }

    pub fn grace_ms() -> u64 {
        250
    }
}
