//! Coffer - a file-level secret vault.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coffer::cli::output;
use coffer::cli::{execute, Cli};
use coffer::error::{ConfigError, Error, ProcessError, UnwrapError, WrapError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("COFFER_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("coffer=debug")
        } else {
            EnvFilter::new("coffer=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli) {
        output::error(&e.to_string());
        if let Some(hint) = suggestion(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}

/// A next step for errors the user can usually fix themselves.
fn suggestion(e: &Error) -> Option<&'static str> {
    match e {
        Error::Config(ConfigError::NoOwners) => {
            Some("add [[owners]] to .coffer.toml or list owners in the envelope")
        }
        Error::Wrap(WrapError::UnknownMethod { .. }) => Some("supported methods: gpg, age"),
        Error::Wrap(WrapError::Process {
            source: ProcessError::Spawn { .. },
            ..
        }) => Some("install GnuPG from https://gnupg.org/download/ or set [gpg] program"),
        Error::Wrap(WrapError::Process { .. }) => {
            Some("check that the recipient keys are imported into your keyring")
        }
        Error::Unwrap(UnwrapError::Exhausted(_)) => Some(
            "import a matching gpg secret key or list your age identity under [age] identities",
        ),
        _ => None,
    }
}
