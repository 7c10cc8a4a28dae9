use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a YAML or JSON document, choosing the parser by extension.
///
/// Unknown extensions try YAML first, then JSON.
pub fn read_document<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {what} '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).with_context(|| format!("parsing {what} yaml"))
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).with_context(|| format!("parsing {what} json"))
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .with_context(|| format!("parsing {what}")),
    }
}
