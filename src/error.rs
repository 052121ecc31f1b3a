/// Error types for every boundary in the app
///
/// Each operation (resolve, submit, export) catches these at its own edge
/// and turns them into a state transition or a notice; nothing here is fatal.

use thiserror::Error;

/// Failures talking to the share store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with status {0}")]
    Status(u16),

    #[error("malformed share record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("this link has already been signed or is no longer active")]
    AlreadySigned,

    #[error("share store is not configured: {0}")]
    NotConfigured(String),
}

/// Failures downloading a single photo
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),
}

/// Failures building or saving the photo archive
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("none of the photos could be downloaded")]
    NothingFetched,

    #[error("could not build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("could not save archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures encoding the signature raster
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("could not encode signature: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failures reading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures turning user input into a share token
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("no share link given")]
    Empty,
}
