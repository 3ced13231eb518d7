//! Coffer - a file-level secret vault.
//!
//! A source file is encrypted into an envelope (`<file>.vault-envelope`)
//! that any of a configured set of owners can decrypt. The payload is
//! sealed with a random data key; the data key is wrapped once per method
//! (gpg, age, ...) for every owner using that method.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── encrypt       # Encrypt files into envelopes
//! │   ├── decrypt       # Decrypt an envelope to stdout
//! │   └── output        # Terminal output helpers
//! └── core/             # Core library components
//!     ├── cipher/       # Key-wrapping methods
//!     │   ├── mod       # Method trait and registry
//!     │   ├── gpg       # gpg CLI method
//!     │   ├── age       # native age method
//!     │   └── process   # Subprocess runner, deadlines, cancellation
//!     ├── config        # .coffer.toml management
//!     ├── crypto        # AES-256-GCM payload encryption
//!     ├── envelope      # Envelope JSON codec
//!     ├── owners        # Owners and the owners checksum
//!     ├── ordered       # Insertion-ordered map
//!     ├── paths         # Source/envelope path convention
//!     ├── fsutil        # Atomic file replacement
//!     └── vault         # Encrypt/decrypt engine
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use coffer::{Config, Engine};
//!
//! # fn main() -> coffer::error::Result<()> {
//! let config = Config::load(Path::new("/srv/app/.coffer.toml"))?;
//! let engine = Engine::from_config(&config);
//! engine.encrypt(Path::new("/srv/app/secrets.env"), &config.owners)?;
//! let plaintext = engine.decrypt(Path::new("/srv/app/secrets.env"))?;
//! # let _ = plaintext;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::cipher::{CancelToken, Context, Method, Registry};
pub use crate::core::config::Config;
pub use crate::core::envelope::Vault;
pub use crate::core::owners::Owner;
pub use crate::core::vault::{Engine, Outcome};
