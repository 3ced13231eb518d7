//! Command helper methods for Test.

use std::fs;
use std::path::PathBuf;
use std::process::Output;

use ::age::secrecy::ExposeSecret;
use ::age::x25519;
use assert_cmd::Command;

use super::Test;

impl Test {
    /// Create a coffer command running in the project directory.
    ///
    /// HOME points at the temporary home; color and log output are off.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("coffer").expect("failed to find coffer binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("COFFER_LOG");
        cmd.env_remove("COFFER_CONFIG");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `coffer encrypt <files>`.
    pub fn encrypt(&self, files: &[&str]) -> Output {
        self.cmd()
            .arg("encrypt")
            .args(files)
            .output()
            .expect("failed to run coffer encrypt")
    }

    /// Shortcut for `coffer decrypt <file>`.
    pub fn decrypt(&self, file: &str) -> Output {
        self.cmd()
            .args(["decrypt", file])
            .output()
            .expect("failed to run coffer decrypt")
    }

    /// Generate an age identity file in the temp home.
    ///
    /// Returns the identity file path and the public key.
    pub fn age_identity(&self, name: &str) -> (PathBuf, String) {
        let identity = x25519::Identity::generate();
        let path = self.home.path().join(name);
        fs::write(
            &path,
            format!("{}\n", identity.to_string().expose_secret()),
        )
        .expect("failed to write identity");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .expect("failed to restrict identity");
        }
        (path, identity.to_public().to_string())
    }

    /// Write `.coffer.toml` with age owners and identity files.
    pub fn age_config<R: AsRef<str>>(&self, identities: &[&PathBuf], recipients: &[R]) {
        let mut config = String::from("[age]\nidentities = [");
        let paths: Vec<String> = identities
            .iter()
            .map(|p| format!("{:?}", p.display().to_string()))
            .collect();
        config.push_str(&paths.join(", "));
        config.push_str("]\n");
        for recipient in recipients {
            config.push_str(&format!("\n[[owners]]\nage = \"{}\"\n", recipient.as_ref()));
        }
        fs::write(self.path(".coffer.toml"), config).expect("failed to write config");
    }
}
