//! Fake wrap methods standing in for external tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use coffer::error::{UnwrapError, WrapError};
use coffer::{Context, Method};
use zeroize::Zeroizing;

/// Reversible fake: XOR every byte with a mask and hex-encode.
///
/// Counts wraps and unwraps so tests can tell whether a key was generated.
#[derive(Clone)]
pub struct Xor {
    pub name: &'static str,
    pub mask: u8,
    pub wraps: Arc<AtomicUsize>,
    pub unwraps: Arc<AtomicUsize>,
    /// Recipient lists passed to each wrap call
    pub seen: Arc<std::sync::Mutex<Vec<Vec<String>>>>,
}

impl Xor {
    pub fn new(name: &'static str, mask: u8) -> Self {
        Self {
            name,
            mask,
            wraps: Arc::default(),
            unwraps: Arc::default(),
            seen: Arc::default(),
        }
    }

    pub fn wraps(&self) -> usize {
        self.wraps.load(Ordering::SeqCst)
    }

    pub fn unwraps(&self) -> usize {
        self.unwraps.load(Ordering::SeqCst)
    }
}

impl Method for Xor {
    fn name(&self) -> &str {
        self.name
    }

    fn wrap(&self, key: &[u8], recipients: &[String], _: &Context) -> Result<Vec<u8>, WrapError> {
        self.wraps.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(recipients.to_vec());
        Ok(key
            .iter()
            .map(|b| format!("{:02x}", b ^ self.mask))
            .collect::<String>()
            .into_bytes())
    }

    fn unwrap(&self, blob: &[u8], _: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        self.unwraps.fetch_add(1, Ordering::SeqCst);
        let malformed = || UnwrapError::MalformedKey {
            method: self.name.to_string(),
        };
        let text = std::str::from_utf8(blob).map_err(|_| malformed())?;
        if text.len() % 2 != 0 {
            return Err(malformed());
        }
        let bytes = (0..text.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map(|b| b ^ self.mask))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;
        Ok(Zeroizing::new(bytes))
    }
}

/// Wraps fine but never holds a credential to unwrap.
#[derive(Clone)]
pub struct Locked {
    pub name: &'static str,
}

impl Method for Locked {
    fn name(&self) -> &str {
        self.name
    }

    fn wrap(&self, _: &[u8], _: &[String], _: &Context) -> Result<Vec<u8>, WrapError> {
        Ok(b"opaque-locked-blob".to_vec())
    }

    fn unwrap(&self, _: &[u8], _: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        Err(UnwrapError::Backend {
            method: self.name.to_string(),
            reason: format!("no {} secret key available", self.name),
        })
    }
}

/// A broken tool that echoes its input back as the "ciphertext".
pub struct Echo;

impl Method for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn wrap(&self, key: &[u8], _: &[String], _: &Context) -> Result<Vec<u8>, WrapError> {
        let mut blob = b"-----BEGIN MESSAGE-----\n".to_vec();
        blob.extend_from_slice(key);
        Ok(blob)
    }

    fn unwrap(&self, blob: &[u8], _: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        Ok(Zeroizing::new(blob.to_vec()))
    }
}

/// Always fails to wrap.
pub struct Broken;

impl Method for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn wrap(&self, _: &[u8], _: &[String], _: &Context) -> Result<Vec<u8>, WrapError> {
        Err(WrapError::Backend {
            method: "broken".to_string(),
            reason: "tool exploded".to_string(),
        })
    }

    fn unwrap(&self, _: &[u8], _: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError> {
        Err(UnwrapError::Backend {
            method: "broken".to_string(),
            reason: "tool exploded".to_string(),
        })
    }
}
