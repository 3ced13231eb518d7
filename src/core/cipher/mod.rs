//! Key-wrapping methods.
//!
//! A method wraps the envelope's data key for a set of recipients and
//! recovers it again. Methods are looked up by name in a [`Registry`], so
//! the vault engine never branches on a method name.
//!
//! ## Methods
//!
//! - **gpg**: GnuPG via the `gpg` CLI. Recipients are key fingerprints or
//!   email addresses; unwrap uses the caller's keyring.
//! - **age**: native x25519 age encryption. Recipients are `age1...` public
//!   keys; unwrap uses identities from configured identity files.
//!
//! ## Adding a Method
//!
//! 1. Implement the [`Method`] trait in a new file
//! 2. Register it in [`Registry::from_config`] (or on a registry at runtime)

use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::core::config::Config;
use crate::core::ordered::OrderedMap;
use crate::error::{UnwrapError, WrapError};

mod age;
mod gpg;
pub mod process;

pub use age::{parse_recipient, Age};
pub use gpg::Gpg;
pub use process::{CancelToken, Context, Invocation, Runner, SystemRunner};

/// Wrap and unwrap a data key with one public-key mechanism.
pub trait Method: Send + Sync {
    /// Name used in owner entries and in the `<name>_cipher` envelope field.
    fn name(&self) -> &str;

    /// Produce one blob that any holder of a private counterpart to any of
    /// `recipients` can unwrap.
    ///
    /// # Errors
    ///
    /// Returns `WrapError` if a recipient is invalid or the tool fails.
    fn wrap(&self, key: &[u8], recipients: &[String], ctx: &Context)
        -> Result<Vec<u8>, WrapError>;

    /// Recover the key from a blob produced by [`Method::wrap`].
    ///
    /// # Errors
    ///
    /// Returns `UnwrapError` if no matching credential is available or the
    /// blob is malformed.
    fn unwrap(&self, blob: &[u8], ctx: &Context) -> Result<Zeroizing<Vec<u8>>, UnwrapError>;
}

/// Methods available to the engine, keyed by name.
#[derive(Default)]
pub struct Registry {
    methods: OrderedMap<Box<dyn Method>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in methods configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(Gpg::new(config.gpg.program.clone()));
        registry.register(Age::new(expand_paths(&config.age.identities)));
        registry
    }

    /// Add a method, replacing any method with the same name.
    pub fn register<M: Method + 'static>(&mut self, method: M) -> &mut Self {
        let name = method.name().to_string();
        self.methods.insert(name, Box::new(method));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Method> {
        self.methods.get(name).map(|m| m.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Expand a leading `~/` against the home directory.
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|p| match (p.strip_prefix("~"), dirs::home_dir()) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => p.clone(),
        })
        .collect()
}
