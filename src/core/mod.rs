//! Core library components.
//!
//! Envelope encryption, key wrapping, and configuration handling. Nothing
//! here changes the process working directory; every operation takes the
//! paths it works on.

pub mod cipher;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod envelope;
pub mod fsutil;
pub mod ordered;
pub mod owners;
pub mod paths;
pub mod vault;
