//! Constants used throughout coffer.
//!
//! Centralizes file names, envelope field names and defaults.

/// Configuration file name (.coffer.toml).
pub const CONFIG_FILE: &str = ".coffer.toml";

/// Suffix appended to a source file's path to name its envelope.
pub const ENVELOPE_SUFFIX: &str = ".vault-envelope";

/// Envelope meta field holding the owners checksum.
pub const OWNERS_CHECKSUM_FIELD: &str = "owners_checksum";

/// Suffix of envelope meta fields holding wrapped keys (`<method>_cipher`).
pub const CIPHER_FIELD_SUFFIX: &str = "_cipher";

/// Default gpg executable.
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Default subprocess deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
