//! Error types for device connection and command orchestration.
//!
//! Transport and resource failures are expressed through [`OrchestratorError`];
//! command-level failure (a device rejecting a command, a non-zero exit) is
//! deliberately *not* an error here; it is carried as data on
//! [`crate::executor::CommandResult`] so callers can branch on it.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors raised by the session pool, the command executor, and the stores.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The requested device identifier is absent from the device registry.
    ///
    /// Not retried; surfaced to the caller as-is.
    #[error("device {0} not found")]
    DeviceNotFound(String),

    /// Neither the device record nor the process-wide configuration provides
    /// a usable credential pair.
    #[error("no usable credentials for device {0}")]
    CredentialsMissing(String),

    /// The transport could not be established or authentication was rejected.
    ///
    /// Carries the underlying transport error text. The caller may retry
    /// manually; no automatic retry is built in.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Session establishment did not complete within the configured deadline.
    #[error("connect timeout for {0}")]
    ConnectTimeout(String),

    /// The transport was lost mid-command.
    ///
    /// Where a batch is in progress this is synthesized into the result
    /// stream rather than raised.
    #[error("command execution failed: {0}")]
    Execution(String),

    /// Command execution did not complete within the configured deadline.
    #[error("command timeout: {0}")]
    ExecTimeout(String),

    /// The device's dialect tag has no command vocabulary registered.
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// A persisted record (rule, tunnel) the caller addressed does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The external record store failed to load or persist a collection.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization failed while talking to the record store.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error from the JSON file store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
