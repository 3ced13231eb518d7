//! Test support utilities for coffer integration tests.
//!
//! Provides isolated temp directories, fake wrap methods and CLI helpers.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod methods;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use methods::*;

use std::fs;
use std::path::PathBuf;

use coffer::Owner;
use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// No process-global state is mutated; child processes use `.current_dir()`
/// and library calls use absolute paths, so tests can run in parallel.
pub struct Test {
    /// Temporary project directory
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        Self { dir, home }
    }

    /// Absolute path of `name` inside the project directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a source file.
    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("failed to write source file");
        path
    }

    /// Read the envelope belonging to source file `name`.
    pub fn envelope(&self, name: &str) -> Vec<u8> {
        fs::read(self.path(&format!("{}.vault-envelope", name))).expect("envelope missing")
    }

    /// Parse the envelope belonging to `name` as JSON.
    pub fn envelope_json(&self, name: &str) -> serde_json::Value {
        serde_json::from_slice(&self.envelope(name)).expect("envelope is not json")
    }
}

/// Build one owner from `(method, recipient)` pairs.
pub fn owner(pairs: &[(&str, &str)]) -> Owner {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}
