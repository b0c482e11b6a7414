use std::{fs, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;
use toml;

/// Parses a TOML file into any `DeserializeOwned` target, with the
/// file path attached to both I/O and parse errors.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML
/// for the target type.
pub fn parse_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Could not open file {:?}", path.display()))?;

    let data: T = toml::from_str(&contents)
        .with_context(|| format!("Could not parse TOML in file {:?}", path.display()))?;

    Ok(data)
}
