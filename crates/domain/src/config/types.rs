//! Value and key types of the configuration store.
//!
//! [`ConfigValue`] is the typed payload stored at a leaf; [`KeyType`] is the
//! declared type of a leaf definition and knows how to cast raw input into
//! its canonical [`ConfigValue`] form. Casting happens on every write and
//! when a default is attached, so values read back are always canonical.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CastError;

/// A single typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Duration(Duration),
    Path(PathBuf),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric value as a float; integers widen losslessly.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the carried type, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Duration(_) => "duration",
            Self::Path(_) => "path",
            Self::List(_) => "list",
        }
    }

    /// Human rendering of the value for error messages; strings are quoted
    /// so an empty or whitespace value stays visible.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Str(value) => format!("{value:?}"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => value.fmt(f),
            Self::Int(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::Str(value) => value.fmt(f),
            Self::Duration(value) => write!(f, "{value:?}"),
            Self::Path(value) => value.display().fmt(f),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Declared type of a leaf key definition.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyType {
    Str,
    Int { min: Option<i64>, max: Option<i64> },
    Float,
    Bool,
    /// Seconds; textual and numeric input is interpreted as float seconds.
    Duration,
    Path,
    /// Closed set of admissible string values.
    Enum { values: Vec<String> },
    List { item: Box<KeyType> },
}

impl KeyType {
    /// Cast raw input into the canonical [`ConfigValue`] for this type.
    ///
    /// Textual input is parsed (so values arriving as strings from an
    /// administrative surface behave like typed ones), numeric input is
    /// widened where lossless, and a scalar offered to a list type becomes
    /// a one-element list.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] describing the expected type and the
    /// offending input when the value does not fit.
    pub fn cast(&self, value: ConfigValue) -> Result<ConfigValue, CastError> {
        let reject = |value: &ConfigValue| CastError::new(self.to_string(), value.describe());
        match self {
            Self::Str => match value {
                ConfigValue::Str(text) => Ok(ConfigValue::Str(text)),
                other => Err(reject(&other)),
            },
            Self::Int { min, max } => {
                let number = match &value {
                    ConfigValue::Int(number) => Some(*number),
                    ConfigValue::Str(text) => text.trim().parse::<i64>().ok(),
                    ConfigValue::Float(number) => integral(*number),
                    _ => None,
                };
                match number {
                    Some(number)
                        if min.is_none_or(|min| number >= min)
                            && max.is_none_or(|max| number <= max) =>
                    {
                        Ok(ConfigValue::Int(number))
                    }
                    _ => Err(reject(&value)),
                }
            }
            Self::Float => match &value {
                ConfigValue::Float(number) => Ok(ConfigValue::Float(*number)),
                #[allow(clippy::cast_precision_loss)]
                ConfigValue::Int(number) => Ok(ConfigValue::Float(*number as f64)),
                ConfigValue::Str(text) => text
                    .trim()
                    .parse::<f64>()
                    .map(ConfigValue::Float)
                    .map_err(|_| reject(&value)),
                _ => Err(reject(&value)),
            },
            Self::Bool => match &value {
                ConfigValue::Bool(flag) => Ok(ConfigValue::Bool(*flag)),
                ConfigValue::Str(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(ConfigValue::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(ConfigValue::Bool(false)),
                    _ => Err(reject(&value)),
                },
                _ => Err(reject(&value)),
            },
            Self::Duration => {
                let seconds = match &value {
                    ConfigValue::Duration(duration) => return Ok(ConfigValue::Duration(*duration)),
                    #[allow(clippy::cast_precision_loss)]
                    ConfigValue::Int(number) => Some(*number as f64),
                    ConfigValue::Float(number) => Some(*number),
                    ConfigValue::Str(text) => text.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match seconds {
                    Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                        Ok(ConfigValue::Duration(Duration::from_secs_f64(seconds)))
                    }
                    _ => Err(reject(&value)),
                }
            }
            Self::Path => match value {
                ConfigValue::Path(path) => Ok(ConfigValue::Path(path)),
                ConfigValue::Str(text) => Ok(ConfigValue::Path(PathBuf::from(text))),
                other => Err(reject(&other)),
            },
            Self::Enum { values } => match &value {
                ConfigValue::Str(text) if values.iter().any(|member| member == text) => {
                    Ok(ConfigValue::Str(text.clone()))
                }
                _ => Err(reject(&value)),
            },
            Self::List { item } => match value {
                ConfigValue::List(entries) => entries
                    .into_iter()
                    .map(|entry| item.cast(entry))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ConfigValue::List),
                scalar => Ok(ConfigValue::List(vec![item.cast(scalar)?])),
            },
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("string"),
            Self::Int {
                min: Some(min),
                max: Some(max),
            } => write!(f, "integer in {min}..={max}"),
            Self::Int {
                min: Some(min),
                max: None,
            } => write!(f, "integer >= {min}"),
            Self::Int {
                min: None,
                max: Some(max),
            } => write!(f, "integer <= {max}"),
            Self::Int {
                min: None,
                max: None,
            } => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("boolean"),
            Self::Duration => f.write_str("duration in seconds"),
            Self::Path => f.write_str("path"),
            Self::Enum { values } => write!(f, "one of {}", values.join(", ")),
            Self::List { item } => write!(f, "list of {item}"),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(number: f64) -> Option<i64> {
    if number.is_finite() && number.fract() == 0.0 && (number as i64) as f64 == number {
        Some(number as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_textual_integer() {
        let ty = KeyType::Int {
            min: None,
            max: None,
        };
        let value = ty.cast(ConfigValue::Str("42".to_string())).unwrap();
        assert_eq!(value, ConfigValue::Int(42));
    }

    #[test]
    fn should_accept_integral_float_as_integer() {
        let ty = KeyType::Int {
            min: None,
            max: None,
        };
        assert_eq!(ty.cast(ConfigValue::Float(7.0)).unwrap(), ConfigValue::Int(7));
        assert!(ty.cast(ConfigValue::Float(7.5)).is_err());
    }

    #[test]
    fn should_enforce_integer_bounds() {
        let ty = KeyType::Int {
            min: Some(0),
            max: Some(100),
        };
        assert!(ty.cast(ConfigValue::Int(100)).is_ok());
        let err = ty.cast(ConfigValue::Int(180)).unwrap_err();
        assert_eq!(err.expected, "integer in 0..=100");
        assert_eq!(err.got, "180");
    }

    #[test]
    fn should_widen_integer_to_float() {
        let value = KeyType::Float.cast(ConfigValue::Int(3)).unwrap();
        assert_eq!(value, ConfigValue::Float(3.0));
    }

    #[test]
    fn should_parse_textual_booleans() {
        for raw in ["true", "Yes", "on", "1"] {
            let value = KeyType::Bool.cast(ConfigValue::Str(raw.to_string())).unwrap();
            assert_eq!(value, ConfigValue::Bool(true), "{raw}");
        }
        for raw in ["false", "No", "off", "0"] {
            let value = KeyType::Bool.cast(ConfigValue::Str(raw.to_string())).unwrap();
            assert_eq!(value, ConfigValue::Bool(false), "{raw}");
        }
        assert!(KeyType::Bool.cast(ConfigValue::Str("maybe".to_string())).is_err());
    }

    #[test]
    fn should_interpret_numbers_as_float_seconds_for_duration() {
        assert_eq!(
            KeyType::Duration.cast(ConfigValue::Float(2.5)).unwrap(),
            ConfigValue::Duration(Duration::from_millis(2500))
        );
        assert_eq!(
            KeyType::Duration.cast(ConfigValue::Int(3)).unwrap(),
            ConfigValue::Duration(Duration::from_secs(3))
        );
        assert_eq!(
            KeyType::Duration
                .cast(ConfigValue::Str("0.25".to_string()))
                .unwrap(),
            ConfigValue::Duration(Duration::from_millis(250))
        );
    }

    #[test]
    fn should_reject_negative_duration() {
        let err = KeyType::Duration.cast(ConfigValue::Float(-1.0)).unwrap_err();
        assert_eq!(err.expected, "duration in seconds");
    }

    #[test]
    fn should_turn_string_into_path() {
        let value = KeyType::Path
            .cast(ConfigValue::Str("/var/lib/porter".to_string()))
            .unwrap();
        assert_eq!(value, ConfigValue::Path(PathBuf::from("/var/lib/porter")));
    }

    #[test]
    fn should_enforce_enum_members() {
        let ty = KeyType::Enum {
            values: vec!["day".to_string(), "night".to_string()],
        };
        assert!(ty.cast(ConfigValue::Str("day".to_string())).is_ok());
        let err = ty.cast(ConfigValue::Str("dusk".to_string())).unwrap_err();
        assert_eq!(err.expected, "one of day, night");
        assert_eq!(err.got, "\"dusk\"");
    }

    #[test]
    fn should_cast_every_list_element() {
        let ty = KeyType::List {
            item: Box::new(KeyType::Int {
                min: None,
                max: None,
            }),
        };
        let value = ty
            .cast(ConfigValue::List(vec![
                ConfigValue::Str("1".to_string()),
                ConfigValue::Int(2),
            ]))
            .unwrap();
        assert_eq!(
            value,
            ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::Int(2)])
        );
    }

    #[test]
    fn should_wrap_scalar_into_single_element_list() {
        let ty = KeyType::List {
            item: Box::new(KeyType::Str),
        };
        let value = ty.cast(ConfigValue::Str("sleep:1".to_string())).unwrap();
        assert_eq!(
            value,
            ConfigValue::List(vec![ConfigValue::Str("sleep:1".to_string())])
        );
    }

    #[test]
    fn should_report_list_item_failures() {
        let ty = KeyType::List {
            item: Box::new(KeyType::Bool),
        };
        let err = ty
            .cast(ConfigValue::List(vec![ConfigValue::Str("maybe".to_string())]))
            .unwrap_err();
        assert_eq!(err.expected, "boolean");
    }

    #[test]
    fn should_render_values_for_display() {
        assert_eq!(ConfigValue::Bool(true).to_string(), "true");
        assert_eq!(ConfigValue::Int(5).to_string(), "5");
        assert_eq!(
            ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::Str("a".to_string())])
                .to_string(),
            "[1, a]"
        );
        assert_eq!(ConfigValue::Str("a b".to_string()).describe(), "\"a b\"");
    }
}
