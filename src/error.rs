//! Error types for coffer.
//!
//! One top-level [`Error`] wraps a small enum per concern so callers can
//! match on the failure class (I/O, envelope parsing, wrapping, unwrapping,
//! payload decryption) without string inspection.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse the envelope {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: EnvelopeError,
    },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wrap(#[from] WrapError),

    #[error(transparent)]
    Unwrap(#[from] UnwrapError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no owners configured and the envelope lists none")]
    NoOwners,
}

/// Envelope (de)serialization errors.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("could not unmarshal json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not decode base64 in the {field:?} value: {source}")]
    Field {
        field: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Subprocess failures.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("could not start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o with {program:?} failed: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {command:?} failed: {status}\nstderr:\n{stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("command {command:?} was cancelled")]
    Cancelled { command: String },

    #[error("command {command:?} timed out after {after:?}")]
    TimedOut { command: String, after: Duration },
}

/// Failures while wrapping a data key for a method's recipients.
#[derive(Error, Debug)]
pub enum WrapError {
    #[error("no recipients: every owner is empty")]
    NoRecipients,

    #[error("no cipher method named {method:?} is available")]
    UnknownMethod { method: String },

    #[error("could not encrypt with {method}: {source}")]
    Process {
        method: String,
        #[source]
        source: ProcessError,
    },

    #[error("invalid {method} recipient {recipient:?}")]
    InvalidRecipient { method: String, recipient: String },

    #[error("could not encrypt with {method}: {reason}")]
    Backend { method: String, reason: String },

    #[error("{method}-encrypted ciphertext contains the plaintext key")]
    PlaintextLeak { method: String },

    #[error("encryption was cancelled")]
    Cancelled,
}

/// Failures while recovering a data key from a wrapped blob.
#[derive(Error, Debug)]
pub enum UnwrapError {
    #[error("no cipher method named {method:?} is available")]
    Unsupported { method: String },

    #[error("could not decrypt with {method}: {source}")]
    Process {
        method: String,
        #[source]
        source: ProcessError,
    },

    #[error("could not decrypt with {method}: no identity available")]
    NoIdentity { method: String },

    #[error("could not decrypt with {method}: {reason}")]
    Backend { method: String, reason: String },

    #[error("{method} returned a malformed key")]
    MalformedKey { method: String },

    #[error("decryption was cancelled")]
    Cancelled,

    #[error("{0}")]
    Exhausted(Failures),
}

/// Every per-method failure collected by the unwrap fallback.
#[derive(Debug, Default)]
pub struct Failures(pub Vec<UnwrapError>);

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "the envelope holds no wrapped keys");
        }
        write!(f, "could not recover the data key:")?;
        for err in &self.0 {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

/// Payload encryption failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("could not encrypt data: {0}")]
    EncryptionFailed(String),

    #[error("could not decrypt data: authentication/decryption failed")]
    DecryptionFailed,

    #[error("invalid data key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
