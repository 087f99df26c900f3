//! # porter-adapter-storage-toml
//!
//! TOML persistence for the configuration store. Key definitions and
//! value overrides are both plain TOML documents: definitions use tables
//! with `_type` and friends, values are ordinary scalars and lists under
//! their dotted paths.
//!
//! Loading is tolerant per key: a value the store rejects (undefined
//! path, failed cast) is logged and skipped so one typo does not keep
//! the hub from booting. Document-level problems (unparseable TOML,
//! colliding definitions) are hard errors.
//!
//! ## Dependency rule
//! Depends on `porter-domain` (the configuration store) only.

pub mod error;

use std::fs;
use std::io;
use std::path::Path;

use porter_domain::config::{Configuration, ConfigValue, Node};
use tracing::{debug, warn};

pub use error::StorageError;

/// Parse a TOML document into the store's raw node shape.
///
/// # Errors
///
/// Parse errors, and [`StorageError::UnsupportedShape`] for arrays of
/// tables.
pub fn parse_document(text: &str) -> Result<Node, StorageError> {
    let table: toml::Table = text.parse()?;
    node_from_toml_table(&table, "")
}

/// Attach key definitions from a TOML document.
///
/// # Errors
///
/// Parse errors, shape errors, and the store's definition conflicts.
pub fn attach_defs_str(config: &mut Configuration, text: &str) -> Result<(), StorageError> {
    let document = parse_document(text)?;
    config.attach_defs(&document)?;
    Ok(())
}

/// Load value overrides from a TOML document, returning how many keys
/// were applied. Keys the store rejects are logged and skipped.
///
/// # Errors
///
/// Parse and shape errors only; per-key rejections do not fail the load.
pub fn load_values_str(config: &mut Configuration, text: &str) -> Result<usize, StorageError> {
    let document = parse_document(text)?;
    Ok(apply_values(config, &document, ""))
}

/// Load value overrides from a TOML file.
///
/// Returns `None` when the file does not exist, `Some(applied)` when it
/// was read.
///
/// # Errors
///
/// Same as [`load_values_str`], plus IO errors other than a missing file.
pub fn load_values_file(
    config: &mut Configuration,
    path: &Path,
) -> Result<Option<usize>, StorageError> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let applied = load_values_str(config, &text)?;
            debug!(path = %path.display(), applied, "configuration loaded");
            Ok(Some(applied))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Render the store's value overrides as a TOML document.
///
/// # Errors
///
/// Serialization failures.
pub fn save_values_string(config: &Configuration) -> Result<String, StorageError> {
    Ok(toml::to_string_pretty(&toml_from_node(&config.values()))?)
}

/// Write the store's value overrides to a TOML file.
///
/// # Errors
///
/// Serialization and IO failures.
pub fn save_values_file(config: &Configuration, path: &Path) -> Result<(), StorageError> {
    fs::write(path, save_values_string(config)?)?;
    debug!(path = %path.display(), "configuration saved");
    Ok(())
}

// ── TOML ↔ node conversion ─────────────────────────────────────────

fn node_from_toml_table(table: &toml::Table, path: &str) -> Result<Node, StorageError> {
    let mut node = Node::table();
    for (key, child) in table {
        node.insert(key.clone(), node_from_toml(child, &join(path, key))?);
    }
    Ok(node)
}

fn node_from_toml(value: &toml::Value, path: &str) -> Result<Node, StorageError> {
    match value {
        toml::Value::Table(table) => node_from_toml_table(table, path),
        other => Ok(Node::Value(value_from_toml(other, path)?)),
    }
}

fn value_from_toml(value: &toml::Value, path: &str) -> Result<ConfigValue, StorageError> {
    match value {
        toml::Value::String(text) => Ok(ConfigValue::Str(text.clone())),
        toml::Value::Integer(number) => Ok(ConfigValue::Int(*number)),
        toml::Value::Float(number) => Ok(ConfigValue::Float(*number)),
        toml::Value::Boolean(flag) => Ok(ConfigValue::Bool(*flag)),
        // The store has no datetime type; keep the literal text.
        toml::Value::Datetime(stamp) => Ok(ConfigValue::Str(stamp.to_string())),
        toml::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| value_from_toml(item, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(ConfigValue::List),
        toml::Value::Table(_) => Err(StorageError::UnsupportedShape {
            path: path.to_string(),
        }),
    }
}

fn toml_from_node(node: &Node) -> toml::Value {
    match node {
        Node::Table(entries) => toml::Value::Table(
            entries
                .iter()
                .map(|(key, child)| (key.clone(), toml_from_node(child)))
                .collect(),
        ),
        Node::Value(value) => toml_from_value(value),
    }
}

fn toml_from_value(value: &ConfigValue) -> toml::Value {
    match value {
        ConfigValue::Str(text) => toml::Value::String(text.clone()),
        ConfigValue::Int(number) => toml::Value::Integer(*number),
        ConfigValue::Float(number) => toml::Value::Float(*number),
        ConfigValue::Bool(flag) => toml::Value::Boolean(*flag),
        // Durations persist as fractional seconds.
        ConfigValue::Duration(duration) => toml::Value::Float(duration.as_secs_f64()),
        ConfigValue::Path(path) => toml::Value::String(path.display().to_string()),
        ConfigValue::List(items) => {
            toml::Value::Array(items.iter().map(toml_from_value).collect())
        }
    }
}

fn apply_values(config: &mut Configuration, node: &Node, prefix: &str) -> usize {
    match node {
        Node::Table(entries) => entries
            .iter()
            .map(|(key, child)| apply_values(config, child, &join(prefix, key)))
            .sum(),
        Node::Value(value) => match config.set(prefix, value.clone()) {
            Ok(()) => 1,
            Err(err) => {
                warn!(path = %prefix, error = %err, "configuration value not applied");
                0
            }
        },
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
