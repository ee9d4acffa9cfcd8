//! Recursive merging of override tables and dotted-key access.
//!
//! Overrides are merged DEEP: a user file containing
//!
//! ```toml
//! [dissipation]
//! epsi = 12
//! ```
//!
//! changes `dissipation.epsi` only, every other `dissipation` key keeps its
//! default. Non-table values (scalars and arrays) are replaced outright, and
//! keys the base does not know are added.

use toml::{Table, Value};

use crate::error::ConfigError;

/// Merges `overrides` into `base`, last write wins.
pub fn deep_merge(base: &mut Table, overrides: &Table) {
    for (key, value) in overrides {
        if let (Some(Value::Table(existing)), Value::Table(incoming)) = (base.get_mut(key), value)
        {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Looks up a dotted path such as `"dissipation.epsi"`.
pub fn get_dotted<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = table.get(parts.next()?)?;
    for part in parts {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

/// Stores `value` at a dotted path, creating intermediate sections as needed.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAssignment`] for an empty path segment and
/// [`ConfigError::Invalid`] when an intermediate segment already holds a
/// non-table value.
pub fn set_dotted(table: &mut Table, key: &str, value: Value) -> Result<(), ConfigError> {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::InvalidAssignment(key.to_string()));
    }
    // `split` always yields at least one item.
    let leaf = parts.pop().unwrap_or(key);

    let mut current = table;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert(Value::Table(Table::new()));
        current = match entry {
            Value::Table(inner) => inner,
            _ => {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    reason: format!("'{part}' is not a section"),
                })
            }
        };
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

/// Parses a command-line style `KEY=VALUE` assignment into a nested table.
///
/// The value is read as a TOML literal (`12`, `1e-6`, `true`, `"viridis"`);
/// anything that is not valid TOML is kept as a bare string, so
/// `plotting.default_color_map=magma` works without quoting.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAssignment`] when there is no `=` or the key
/// is empty.
pub fn parse_assignment(raw: &str) -> Result<Table, ConfigError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidAssignment(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::InvalidAssignment(raw.to_string()));
    }

    let mut table = Table::new();
    set_dotted(&mut table, key, parse_literal(value.trim()))?;
    Ok(table)
}

fn parse_literal(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
