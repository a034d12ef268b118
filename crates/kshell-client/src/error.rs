//! Client-side error types.

use kshell_protocol::ReplyError;
use thiserror::Error;

/// Failure of a [`DeviceClient`](crate::DeviceClient) operation.
///
/// Device-signalled rejections (the 5xx status lines) get their own variants
/// so callers can react to, say, a failed login without string matching.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The device closed the connection where a reply was expected.
    #[error("connection closed by the device")]
    ConnectionClosed,

    /// A reply line could not be interpreted.
    #[error(transparent)]
    Reply(#[from] ReplyError),

    /// The device rejected the login or challenge digest.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A login was sent on an already authenticated session.
    #[error("already logged in")]
    AlreadyAuthenticated,

    /// A command was sent before authentication.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The device did not recognize the command.
    #[error("device rejected the command as unknown")]
    UnknownCommand,

    /// The device rejected a parameter as missing or out of range.
    #[error("device rejected a parameter")]
    InvalidParameter,

    /// The device rejected a value as malformed.
    #[error("device rejected a value")]
    InvalidValue,
}

/// Failure while reading or writing the saved-connection store.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// No per-user configuration directory exists on this platform.
    #[error("no configuration directory for this platform")]
    NoConfigDir,

    /// Reading or writing the store file failed.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file held something other than the expected JSON.
    #[error("store file is not valid: {0}")]
    Format(#[from] serde_json::Error),
}
