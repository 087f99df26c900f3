//! Storage-specific error type wrapping TOML and IO errors.

use porter_domain::error::ConfigError;

/// Errors originating from the TOML configuration layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The document is not valid TOML.
    #[error("TOML parse error")]
    Parse(#[from] toml::de::Error),

    /// The value tree could not be rendered as TOML.
    #[error("TOML serialize error")]
    Serialize(#[from] toml::ser::Error),

    /// Reading or writing the file failed.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// The configuration store rejected the document.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// A TOML shape the store cannot hold, such as an array of tables.
    #[error("unsupported TOML shape at {path}")]
    UnsupportedShape { path: String },
}
