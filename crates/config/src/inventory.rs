//! In-place patching of YAML inventory files.
//!
//! Provisioning writes inventory files (manager addresses, credentials,
//! install options) that scenarios tweak before use. Edits address keys with
//! dotted paths; missing intermediate mappings are created.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// Apply `edits` to the YAML file at `path` and rewrite it atomically.
pub fn patch_yaml(path: &Path, edits: &[(&str, Value)]) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let mut doc: Value = if text.trim().is_empty() {
        Value::Mapping(Mapping::new())
    } else {
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
    };

    apply_edits(&mut doc, edits)?;

    let out = serde_yaml::to_string(&doc).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let tmp = path.with_extension("patch.tmp");
    std::fs::write(&tmp, out).map_err(|e| ConfigError::io(&tmp, e))?;
    std::fs::File::open(&tmp).and_then(|f| f.sync_all()).map_err(|e| ConfigError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ConfigError::io(path, e))
}

/// Apply edits to an in-memory document.
pub fn apply_edits(doc: &mut Value, edits: &[(&str, Value)]) -> Result<()> {
    for (key, value) in edits {
        set_path(doc, key, value.clone())?;
    }
    Ok(())
}

fn set_path(doc: &mut Value, dotted: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = dotted.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidField {
            path: dotted.to_owned(),
            message: "empty key segment".to_owned(),
        });
    }

    let mut cursor = doc;
    for (i, part) in parts.iter().enumerate() {
        if cursor.is_null() {
            *cursor = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = cursor else {
            return Err(ConfigError::InvalidField {
                path: parts[..i].join("."),
                message: "not a mapping".to_owned(),
            });
        };
        let key = Value::String((*part).to_owned());
        if i == parts.len() - 1 {
            map.insert(key, value);
            return Ok(());
        }
        cursor = map.entry(key).or_insert(Value::Null);
    }
    Ok(())
}
