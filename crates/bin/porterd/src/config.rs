//! Boot configuration — builtin key definitions plus an optional TOML
//! overrides file.
//!
//! The overrides file is looked up at `$PORTER_CONFIG`, falling back to
//! `porter.toml` in the working directory. Every builtin key carries a
//! default so the file is optional.

use std::path::{Path, PathBuf};

use porter_adapter_storage_toml::{StorageError, attach_defs_str, load_values_file};
use porter_domain::config::Configuration;

/// Key definitions compiled into the daemon.
const BUILTIN_DEFS: &str = include_str!("../defs/builtin.toml");

/// Where to look for overrides: `$PORTER_CONFIG`, or `porter.toml` in
/// the working directory.
#[must_use]
pub fn overrides_path() -> PathBuf {
    std::env::var("PORTER_CONFIG").map_or_else(|_| PathBuf::from("porter.toml"), PathBuf::from)
}

/// Build the configuration store: attach the builtin definitions, then
/// apply the overrides file when one exists.
///
/// Returns the store and the number of override values applied (`None`
/// when no file was found).
///
/// # Errors
///
/// Fails when the builtin definitions do not attach (a packaging bug)
/// or the overrides file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<(Configuration, Option<usize>), StorageError> {
    let mut config = Configuration::new();
    attach_defs_str(&mut config, BUILTIN_DEFS)?;
    let applied = load_values_file(&mut config, path)?;
    Ok((config, applied))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use porter_domain::config::ConfigValue;

    use super::*;

    #[test]
    fn should_provide_builtin_defaults() {
        let (config, applied) = load(Path::new("/nonexistent/porter.toml")).unwrap();
        assert_eq!(applied, None);
        assert_eq!(config.get_str("logging.filter").unwrap(), "info");
        assert_eq!(config.get_str("keyboard.name").unwrap(), "virtual");
        assert_eq!(config.get_list("keyboard.inputs").unwrap(), vec![]);
        assert_eq!(config.get_str("suntime.twilight").unwrap(), "official");
        assert_eq!(
            config.get_duration("shutdown.drain_timeout").unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn should_apply_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("porter.toml");
        std::fs::write(
            &path,
            r#"
            [logging]
            filter = "debug"

            [keyboard]
            inputs = ["doorbell", "letterbox"]

            [suntime]
            latitude = 48.1
            "#,
        )
        .unwrap();

        let (config, applied) = load(&path).unwrap();
        assert_eq!(applied, Some(3));
        assert_eq!(config.get_str("logging.filter").unwrap(), "debug");
        assert_eq!(
            config.get_list("keyboard.inputs").unwrap(),
            vec![
                ConfigValue::Str("doorbell".to_string()),
                ConfigValue::Str("letterbox".to_string()),
            ]
        );
        assert!((config.get_float("suntime.latitude").unwrap() - 48.1).abs() < f64::EPSILON);
        // Untouched keys keep their builtin defaults.
        assert_eq!(config.get_str("keyboard.name").unwrap(), "virtual");
    }

    #[test]
    fn should_read_event_chains_from_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("porter.toml");
        std::fs::write(
            &path,
            r#"
            [events]
            OnStartup = ["sleep:0.5", "out:13,true"]
            OnKeyDown_doorbell = ["skip:5", "out:13,true,false,1000"]
            "#,
        )
        .unwrap();

        let (config, _) = load(&path).unwrap();
        assert_eq!(
            config.children("events").unwrap(),
            vec!["OnKeyDown_doorbell", "OnStartup"]
        );
        let chain = config.get_list("events.OnStartup").unwrap();
        assert_eq!(
            chain,
            vec![
                ConfigValue::Str("sleep:0.5".to_string()),
                ConfigValue::Str("out:13,true".to_string()),
            ]
        );
    }

    #[test]
    fn should_fail_on_malformed_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("porter.toml");
        std::fs::write(&path, "invalid {{{").unwrap();
        assert!(load(&path).is_err());
    }
}
