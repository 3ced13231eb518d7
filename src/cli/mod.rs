//! Command-line interface.

pub mod decrypt;
pub mod encrypt;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::core::constants;
use crate::core::vault::Engine;
use crate::error::Result;

/// Coffer - a file-level secret vault.
#[derive(Parser)]
#[command(
    name = "coffer",
    about = "Encrypt files into envelopes any configured owner can open",
    version
)]
pub struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "chdir", global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Configuration file (default: .coffer.toml in the working directory)
    #[arg(long, global = true, env = "COFFER_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deadline in seconds for each gpg invocation
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt files into their envelopes (no-op when already up to date)
    Encrypt {
        /// Source files (or their .vault-envelope files)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decrypt an envelope and write the plaintext to stdout
    Decrypt {
        /// Source file (or its .vault-envelope file)
        file: PathBuf,
    },
}

/// Resolved working directory, configuration and engine for one run.
pub struct Session {
    base: PathBuf,
    pub config: Config,
    pub engine: Engine,
}

impl Session {
    /// Resolve the base directory, load the config and build the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined or the
    /// configuration is invalid.
    pub fn open(chdir: Option<&Path>, config: Option<&Path>, timeout: Option<u64>) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|source| crate::error::Error::Read {
            path: PathBuf::from("."),
            source,
        })?;
        let base = match chdir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        let config_path = match config {
            Some(path) => base.join(path),
            None => base.join(constants::CONFIG_FILE),
        };
        let mut config = Config::load(&config_path)?;
        if let Some(secs) = timeout {
            config.process.timeout_secs = secs;
        }

        let engine = Engine::from_config(&config);
        Ok(Self {
            base,
            config,
            engine,
        })
    }

    /// Resolve `path` against the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base.join(path)
    }
}

/// Execute a command.
pub fn execute(cli: Cli) -> Result<()> {
    let session = Session::open(
        cli.chdir.as_deref(),
        cli.config.as_deref(),
        cli.timeout,
    )?;

    match cli.command {
        Command::Encrypt { files } => encrypt::execute(&session, &files),
        Command::Decrypt { file } => decrypt::execute(&session, &file),
    }
}
