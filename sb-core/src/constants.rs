//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "simbook";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capability names reported in permission failures.
pub mod capabilities {
    /// Capability guarding record reads.
    pub const READ_PHONEBOOK: &str = "phonebook.read";
    /// Capability guarding record writes.
    pub const WRITE_PHONEBOOK: &str = "phonebook.write";
}
