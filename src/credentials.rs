//! Credential loading from the runtime `.env` file.
//!
//! Precedence for every lookup: process environment first, then the `.env`
//! file. The file must be private (`0600`) on unix.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

/// Secret values keyed by environment variable name.
#[derive(Clone, Default)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        write!(f, "Credentials {{ names: {names:?}, values: <redacted> }}")
    }
}

impl Credentials {
    /// Wrap an already-loaded name/value map.
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// The value for `name`; blank values are treated as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(value) if !value.trim().is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Like [`Credentials::get`] but owned, failing when unset.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing variable.
    pub fn require(&self, name: &str) -> anyhow::Result<String> {
        match self.get(name) {
            Some(value) => Ok(value.to_owned()),
            None => anyhow::bail!("credential {name} is not set (checked .env and environment)"),
        }
    }

    /// Let process environment values win over the `.env` file for `names`.
    pub fn with_env_overrides(mut self, names: &[&str]) -> Self {
        self.apply_overrides(names, |name| std::env::var(name).ok());
        self
    }

    fn apply_overrides(&mut self, names: &[&str], lookup: impl Fn(&str) -> Option<String>) {
        for name in names {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    self.values.insert((*name).to_owned(), value);
                }
                _ => {}
            }
        }
    }
}

/// Parse a `.env` file that must exist and be private.
///
/// # Errors
///
/// Fails when the file is missing, readable by group/other on unix, or
/// contains a line dotenvy cannot parse.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.is_file() {
        anyhow::bail!("no credentials file at {}", path.display());
    }
    ensure_private(path)?;

    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("cannot open {}", path.display()))?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("malformed entry in {}", path.display()))?;

    Ok(Credentials::from_map(entries))
}

/// [`load_credentials`], or empty credentials when `path` does not exist.
///
/// # Errors
///
/// Fails only when the file exists but is unusable.
pub fn load_optional_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if path.exists() {
        return load_credentials(path);
    }
    tracing::debug!(path = %path.display(), "no .env file, secrets come from the environment");
    Ok(Credentials::default())
}

#[cfg(unix)]
fn ensure_private(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .permissions()
        .mode()
        & 0o777;
    if mode & 0o077 != 0 {
        anyhow::bail!(
            "{} is accessible by other users (mode {mode:o}); run chmod 600 on it",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
