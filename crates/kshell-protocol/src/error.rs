//! Error types for the wire protocol.

use thiserror::Error;

/// Typed failure for a received command line.
///
/// These are protocol data, not transport faults: each one maps to a reply
/// the session sends back, and the session keeps running. The exact reply
/// depends on the authentication state (pre-auth, everything but a login
/// attempt collapses to `505 FORBIDDEN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No recognized command shape matched the line.
    #[error("unknown command")]
    UnknownCommand,

    /// A recognized command carried a missing or out-of-range parameter.
    #[error("invalid parameter")]
    InvalidParameter,

    /// A recognized command carried a malformed value token.
    #[error("invalid value")]
    InvalidValue,

    /// A `login`/`clogin` line with missing fields. Pre-auth this reads as
    /// a failed attempt (503); post-auth as a re-login (504).
    #[error("malformed login")]
    MalformedLogin,
}

/// Errors raised while parsing reply lines on the client side.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The line does not start with a numeric status code.
    #[error("reply line has no status code: {line:?}")]
    MissingStatus {
        /// The offending line.
        line: String,
    },

    /// The status code is not one the protocol defines.
    #[error("unknown status code {code} in reply: {line:?}")]
    UnknownStatus {
        /// The numeric code found on the line.
        code: u16,
        /// The offending line.
        line: String,
    },

    /// The reply's status class was not the one the operation expects.
    #[error("expected {expected} reply, got: {line:?}")]
    UnexpectedStatus {
        /// What the caller was waiting for.
        expected: &'static str,
        /// The offending line.
        line: String,
    },

    /// A payload did not have the shape the operation requires.
    #[error("malformed {what} payload: {text:?}")]
    MalformedPayload {
        /// Which payload format was expected.
        what: &'static str,
        /// The offending payload text.
        text: String,
    },
}
