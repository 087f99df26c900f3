//! Typed, namespaced, wildcard-addressable configuration store.
//!
//! The store keeps two trees. The *definition* tree declares what keys
//! exist: each leaf carries a type, an optional default, and a
//! description; a segment named `*` stands for any single concrete
//! segment (one sub-namespace per pin, per event, per sender). The
//! *value* tree holds only concrete overrides; reads fall back to the
//! leaf's default when no override is stored.
//!
//! Definition resolution walks the path segment by segment, preferring
//! an exact child over the wildcard child at every level. Values are
//! always addressed by concrete segments.

pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CastError, ConfigError};

pub use types::{ConfigValue, KeyType};

/// One node of a raw key-value document: either a nested table or a
/// typed scalar/list. Storage adapters translate their on-disk format
/// into this shape; the store interprets it.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Table(BTreeMap<String, Node>),
    Value(ConfigValue),
}

impl Node {
    /// Create an empty table node.
    #[must_use]
    pub fn table() -> Self {
        Self::Table(BTreeMap::new())
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Table(entries) => Some(entries),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            Self::Table(_) => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Insert a child under a table node; a value node is replaced by a
    /// fresh table first.
    pub fn insert(&mut self, key: impl Into<String>, child: Node) {
        if let Self::Value(_) = self {
            *self = Self::table();
        }
        if let Self::Table(entries) = self {
            entries.insert(key.into(), child);
        }
    }
}

impl From<ConfigValue> for Node {
    fn from(value: ConfigValue) -> Self {
        Self::Value(value)
    }
}

/// A leaf in the definition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDef {
    pub ty: KeyType,
    pub default: Option<ConfigValue>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
enum DefNode {
    Namespace(BTreeMap<String, DefNode>),
    Leaf(KeyDef),
}

/// The typed configuration store.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    defs: BTreeMap<String, DefNode>,
    values: BTreeMap<String, Node>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach key definitions from a raw document.
    ///
    /// A table containing a `_type` entry declares a leaf; its siblings
    /// starting with `_` are interpreted as definition flags (`_default`,
    /// `_description`, `_min`, `_max`, `_values`, `_membertype`), and
    /// unrecognized flags are ignored. Any other table is a namespace.
    /// Defaults are cast to the declared type here, at attach time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefinitionConflict`] when a path is already
    /// defined with a different shape, and [`ConfigError::InvalidValue`]
    /// when a flag or default does not fit the declared type.
    pub fn attach_defs(&mut self, document: &Node) -> Result<(), ConfigError> {
        let Some(table) = document.as_table() else {
            return Err(ConfigError::DefinitionConflict {
                path: String::new(),
            });
        };
        Self::attach_table(&mut self.defs, table, "")
    }

    fn attach_table(
        defs: &mut BTreeMap<String, DefNode>,
        table: &BTreeMap<String, Node>,
        prefix: &str,
    ) -> Result<(), ConfigError> {
        for (key, node) in table {
            let path = join_path(prefix, key);
            let Some(child) = node.as_table() else {
                return Err(ConfigError::DefinitionConflict { path });
            };
            if child.contains_key("_type") {
                let def = Self::parse_key_def(child, &path)?;
                match defs.get(key) {
                    None => {
                        defs.insert(key.clone(), DefNode::Leaf(def));
                    }
                    Some(_) => return Err(ConfigError::DefinitionConflict { path }),
                }
            } else {
                let entry = defs
                    .entry(key.clone())
                    .or_insert_with(|| DefNode::Namespace(BTreeMap::new()));
                match entry {
                    DefNode::Namespace(nested) => Self::attach_table(nested, child, &path)?,
                    DefNode::Leaf(_) => {
                        return Err(ConfigError::DefinitionConflict { path });
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_key_def(table: &BTreeMap<String, Node>, path: &str) -> Result<KeyDef, ConfigError> {
        let invalid = |cause: CastError| ConfigError::InvalidValue {
            path: path.to_string(),
            cause,
        };

        for (key, node) in table {
            if !key.starts_with('_') {
                return Err(ConfigError::DefinitionConflict {
                    path: join_path(path, key),
                });
            }
            if node.as_value().is_none() {
                return Err(ConfigError::DefinitionConflict {
                    path: join_path(path, key),
                });
            }
        }

        let flag_str = |name: &str| -> Option<&str> {
            table.get(name).and_then(Node::as_value).and_then(ConfigValue::as_str)
        };
        let flag_int = |name: &str| -> Option<i64> {
            table.get(name).and_then(Node::as_value).and_then(ConfigValue::as_int)
        };

        let type_name = flag_str("_type")
            .ok_or_else(|| invalid(CastError::new("string type tag in _type", "missing")))?;

        let ty = match type_name {
            "string" | "str" => KeyType::Str,
            "int" | "integer" => KeyType::Int {
                min: flag_int("_min"),
                max: flag_int("_max"),
            },
            "float" => KeyType::Float,
            "bool" | "boolean" => KeyType::Bool,
            "duration" => KeyType::Duration,
            "path" => KeyType::Path,
            "enum" => {
                let values = table
                    .get("_values")
                    .and_then(Node::as_value)
                    .and_then(ConfigValue::as_list)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(ConfigValue::as_str)
                            .map(str::to_owned)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                if values.is_empty() {
                    return Err(invalid(CastError::new(
                        "non-empty _values list for enum",
                        "missing",
                    )));
                }
                KeyType::Enum { values }
            }
            "list" => {
                let item = match flag_str("_membertype").unwrap_or("string") {
                    "string" | "str" => KeyType::Str,
                    "int" | "integer" => KeyType::Int {
                        min: None,
                        max: None,
                    },
                    "float" => KeyType::Float,
                    "bool" | "boolean" => KeyType::Bool,
                    "duration" => KeyType::Duration,
                    "path" => KeyType::Path,
                    other => {
                        return Err(invalid(CastError::new(
                            "scalar _membertype",
                            format!("{other:?}"),
                        )));
                    }
                };
                KeyType::List {
                    item: Box::new(item),
                }
            }
            other => {
                return Err(invalid(CastError::new("known type tag", format!("{other:?}"))));
            }
        };

        let default = match table.get("_default").and_then(Node::as_value) {
            Some(raw) => Some(ty.cast(raw.clone()).map_err(invalid)?),
            None => None,
        };
        let description = flag_str("_description").unwrap_or_default().to_string();

        Ok(KeyDef {
            ty,
            default,
            description,
        })
    }

    /// Look up the definition a path resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UndefinedKey`] when no definition matches
    /// (not even via wildcard), [`ConfigError::PathTooLong`] when the
    /// path continues past a leaf, and [`ConfigError::PathTooShort`]
    /// when it ends on a namespace.
    pub fn definition(&self, path: &str) -> Result<&KeyDef, ConfigError> {
        let segments = split_path(path)?;
        let mut current = &self.defs;
        let mut remaining = segments.as_slice();
        while let Some((segment, rest)) = remaining.split_first() {
            let child = current
                .get(*segment)
                .or_else(|| current.get("*"))
                .ok_or_else(|| ConfigError::UndefinedKey {
                    path: path.to_string(),
                })?;
            match child {
                DefNode::Leaf(def) if rest.is_empty() => return Ok(def),
                DefNode::Leaf(_) => {
                    return Err(ConfigError::PathTooLong {
                        path: path.to_string(),
                    });
                }
                DefNode::Namespace(nested) => {
                    current = nested;
                    remaining = rest;
                }
            }
        }
        Err(ConfigError::PathTooShort {
            path: path.to_string(),
        })
    }

    /// Read the value at `path`, falling back to the definition default.
    ///
    /// # Errors
    ///
    /// Resolution errors as in [`Configuration::definition`], plus
    /// [`ConfigError::NoValueSet`] when neither an override nor a
    /// default exists.
    pub fn get(&self, path: &str) -> Result<ConfigValue, ConfigError> {
        let def = self.definition(path)?;
        let segments = split_path(path)?;
        if let Some(Node::Value(value)) = self.value_at(&segments) {
            return Ok(value.clone());
        }
        def.default
            .clone()
            .ok_or_else(|| ConfigError::NoValueSet {
                path: path.to_string(),
            })
    }

    /// Store a typed value at `path`, casting it into the leaf's type.
    ///
    /// Intermediate value tables are created as needed.
    ///
    /// # Errors
    ///
    /// Resolution errors as in [`Configuration::definition`], plus
    /// [`ConfigError::InvalidValue`] when the cast fails.
    pub fn set(&mut self, path: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let cast = self
            .definition(path)?
            .ty
            .cast(value)
            .map_err(|cause| ConfigError::InvalidValue {
                path: path.to_string(),
                cause,
            })?;
        let segments = split_path(path)?;
        let (leaf, parents) = segments.split_last().unwrap_or((&"", &[]));
        let mut current = &mut self.values;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(Node::table);
            if entry.as_table().is_none() {
                *entry = Node::table();
            }
            let Node::Table(nested) = entry else {
                unreachable!("scalar entries were replaced by tables above")
            };
            current = nested;
        }
        current.insert((*leaf).to_string(), Node::Value(cast));
        Ok(())
    }

    /// Parse and store a textual value at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::set`].
    pub fn set_str(&mut self, path: &str, raw: &str) -> Result<(), ConfigError> {
        self.set(path, ConfigValue::Str(raw.to_string()))
    }

    /// Remove a stored override, reverting `get` to the default.
    ///
    /// Removing a key that was never set is a no-op.
    ///
    /// # Errors
    ///
    /// Resolution errors as in [`Configuration::definition`], plus
    /// [`ConfigError::RequiredKeyMissing`] when the leaf has no default
    /// (a value is mandatory, so the override must not go away).
    pub fn delete(&mut self, path: &str) -> Result<(), ConfigError> {
        let def = self.definition(path)?;
        if def.default.is_none() {
            return Err(ConfigError::RequiredKeyMissing {
                path: path.to_string(),
            });
        }
        let segments = split_path(path)?;
        Self::remove_at(&mut self.values, &segments);
        Ok(())
    }

    fn remove_at(table: &mut BTreeMap<String, Node>, segments: &[&str]) -> bool {
        let Some((segment, rest)) = segments.split_first() else {
            return false;
        };
        if rest.is_empty() {
            table.remove(*segment);
        } else if let Some(Node::Table(nested)) = table.get_mut(*segment) {
            Self::remove_at(nested, rest);
            if nested.is_empty() {
                table.remove(*segment);
            }
        }
        table.is_empty()
    }

    /// List the immediate value-subkeys stored under a namespace path.
    ///
    /// An empty `path` lists the root. Only stored values are listed;
    /// defaults living behind wildcard definitions have no concrete
    /// name until something is stored under them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotANamespace`] when the path resolves to
    /// a leaf definition, and [`ConfigError::UndefinedKey`] when it
    /// resolves to nothing.
    pub fn children(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        if !path.is_empty() {
            let segments = split_path(path)?;
            let mut current = &self.defs;
            let mut remaining = segments.as_slice();
            while let Some((segment, rest)) = remaining.split_first() {
                let child = current
                    .get(*segment)
                    .or_else(|| current.get("*"))
                    .ok_or_else(|| ConfigError::UndefinedKey {
                        path: path.to_string(),
                    })?;
                match child {
                    DefNode::Leaf(_) => {
                        return Err(ConfigError::NotANamespace {
                            path: path.to_string(),
                        });
                    }
                    DefNode::Namespace(nested) => {
                        current = nested;
                        remaining = rest;
                    }
                }
            }
        }

        let table = if path.is_empty() {
            Some(&self.values)
        } else {
            let segments = split_path(path)?;
            match self.value_at(&segments) {
                Some(Node::Table(entries)) => Some(entries),
                _ => None,
            }
        };
        Ok(table
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Bind a read accessor to a namespace prefix.
    #[must_use]
    pub fn view<'a>(&'a self, prefix: &str) -> ConfigView<'a> {
        ConfigView {
            config: self,
            prefix: prefix.to_string(),
        }
    }

    /// All dotted paths known to the store: defined paths (wildcards
    /// rendered literally) plus stored value paths, ordered so that a
    /// wildcard segment sorts after its concrete siblings.
    #[must_use]
    pub fn key_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        Self::collect_def_paths(&self.defs, "", &mut paths);
        Self::collect_value_paths(&self.values, "", &mut paths);
        paths.sort_by(|a, b| compare_paths(a, b));
        paths.dedup();
        paths
    }

    fn collect_def_paths(defs: &BTreeMap<String, DefNode>, prefix: &str, out: &mut Vec<String>) {
        for (key, node) in defs {
            let path = join_path(prefix, key);
            match node {
                DefNode::Leaf(_) => out.push(path),
                DefNode::Namespace(nested) => Self::collect_def_paths(nested, &path, out),
            }
        }
    }

    fn collect_value_paths(values: &BTreeMap<String, Node>, prefix: &str, out: &mut Vec<String>) {
        for (key, node) in values {
            let path = join_path(prefix, key);
            match node {
                Node::Value(_) => out.push(path),
                Node::Table(nested) => Self::collect_value_paths(nested, &path, out),
            }
        }
    }

    fn value_at(&self, segments: &[&str]) -> Option<&Node> {
        let (first, rest) = segments.split_first()?;
        let mut node = self.values.get(*first)?;
        for segment in rest {
            node = node.as_table()?.get(*segment)?;
        }
        Some(node)
    }

    /// Typed read: string.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get`], plus a type mismatch when the
    /// key holds something else.
    pub fn get_str(&self, path: &str) -> Result<String, ConfigError> {
        let value = self.get(path)?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| type_mismatch(path, "string", &value))
    }

    /// Typed read: integer.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_int(&self, path: &str) -> Result<i64, ConfigError> {
        let value = self.get(path)?;
        value
            .as_int()
            .ok_or_else(|| type_mismatch(path, "integer", &value))
    }

    /// Typed read: float. Integer values widen losslessly.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_float(&self, path: &str) -> Result<f64, ConfigError> {
        let value = self.get(path)?;
        value
            .as_float()
            .ok_or_else(|| type_mismatch(path, "float", &value))
    }

    /// Typed read: boolean.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        let value = self.get(path)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(path, "boolean", &value))
    }

    /// Typed read: duration.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_duration(&self, path: &str) -> Result<Duration, ConfigError> {
        let value = self.get(path)?;
        value
            .as_duration()
            .ok_or_else(|| type_mismatch(path, "duration", &value))
    }

    /// Typed read: filesystem path.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_path(&self, path: &str) -> Result<PathBuf, ConfigError> {
        let value = self.get(path)?;
        value
            .as_path()
            .map(PathBuf::from)
            .ok_or_else(|| type_mismatch(path, "path", &value))
    }

    /// Typed read: list.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_list(&self, path: &str) -> Result<Vec<ConfigValue>, ConfigError> {
        let value = self.get(path)?;
        value
            .as_list()
            .map(<[ConfigValue]>::to_vec)
            .ok_or_else(|| type_mismatch(path, "list", &value))
    }

    /// Snapshot of the stored value tree, for persistence.
    #[must_use]
    pub fn values(&self) -> Node {
        Node::Table(self.values.clone())
    }
}

fn type_mismatch(path: &str, expected: &str, value: &ConfigValue) -> ConfigError {
    ConfigError::InvalidValue {
        path: path.to_string(),
        cause: CastError::new(expected, value.type_name()),
    }
}

/// Read accessor bound to a namespace prefix.
///
/// Every operation prefixes its path argument, so a collaborator can be
/// handed `config.view("mail.senders.alerts")` and read `"host"`,
/// `"port"` and friends relatively. Views nest.
#[derive(Debug, Clone)]
pub struct ConfigView<'a> {
    config: &'a Configuration,
    prefix: String,
}

impl<'a> ConfigView<'a> {
    fn full(&self, path: &str) -> String {
        if path.is_empty() {
            self.prefix.clone()
        } else {
            join_path(&self.prefix, path)
        }
    }

    /// The prefix this view is bound to.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get`].
    pub fn get(&self, path: &str) -> Result<ConfigValue, ConfigError> {
        self.config.get(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_str`].
    pub fn get_str(&self, path: &str) -> Result<String, ConfigError> {
        self.config.get_str(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_int`].
    pub fn get_int(&self, path: &str) -> Result<i64, ConfigError> {
        self.config.get_int(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_float`].
    pub fn get_float(&self, path: &str) -> Result<f64, ConfigError> {
        self.config.get_float(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_bool`].
    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        self.config.get_bool(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_duration`].
    pub fn get_duration(&self, path: &str) -> Result<Duration, ConfigError> {
        self.config.get_duration(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_path`].
    pub fn get_path(&self, path: &str) -> Result<PathBuf, ConfigError> {
        self.config.get_path(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::get_list`].
    pub fn get_list(&self, path: &str) -> Result<Vec<ConfigValue>, ConfigError> {
        self.config.get_list(&self.full(path))
    }

    /// # Errors
    ///
    /// Same as [`Configuration::children`].
    pub fn children(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        self.config.children(&self.full(path))
    }

    /// Narrow this view to a nested namespace.
    #[must_use]
    pub fn view(&self, path: &str) -> ConfigView<'a> {
        self.config.view(&self.full(path))
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::UndefinedKey {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

/// Segment-wise path ordering where `*` sorts after concrete siblings.
fn compare_paths(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x == y => {}
            (Some("*"), Some(_)) => return Ordering::Greater,
            (Some(_), Some("*")) => return Ordering::Less,
            (Some(x), Some(y)) => return x.cmp(y),
        }
    }
}
