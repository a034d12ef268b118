//! KSHELL outlet-control protocol.
//!
//! This crate provides the wire-level types for talking to (and emulating)
//! networked power distribution units that expose four switchable outlets
//! through the line-based KSHELL text protocol over TCP. It is I/O-free:
//! both the client and the device emulator build on these types.
//!
//! # Protocol Overview
//!
//! - **Commands** (client → device): one text command per line, terminated
//!   with `\r\n`. See [`Command`] for the full grammar.
//! - **Replies** (device → client): one status line per command, a numeric
//!   status class followed by an optional payload. See [`Response`] for the
//!   device side and [`Reply`] for the client-side parse.
//!
//! A session opens with a welcome line carrying a random per-session salt:
//!
//! ```text
//! 100 HELLO 4A7C1B - KSHELL V1.2
//! ```
//!
//! # Authentication
//!
//! Until a `login` or `clogin` succeeds, every other command is answered
//! with `505 FORBIDDEN`. `login` sends the password in the clear; `clogin`
//! sends the lowercase hex MD5 digest of `user + password + salt` with the
//! salt formatted exactly as it appeared in the welcome line (uppercase
//! hex, no padding). See [`challenge_response`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kshell_protocol::{challenge_response, parse_welcome, Command, Reply};
//!
//! let salt = parse_welcome("100 HELLO 2A - KSHELL V1.2")?;
//! let cmd = Command::CLogin {
//!     user: "admin".to_string(),
//!     hash: challenge_response("admin", "admin", salt),
//! };
//! let line = cmd.encode();
//!
//! // Interpret what comes back
//! let reply = Reply::parse("250 OK")?;
//! assert!(reply.is_ok());
//! ```

mod auth;
mod commands;
mod error;
mod responses;

pub use auth::*;
pub use commands::*;
pub use error::*;
pub use responses::*;

/// Record terminator for both directions of the wire protocol.
pub const LINE_ENDING: &str = "\r\n";

/// TCP port the devices listen on.
pub const DEFAULT_PORT: u16 = 1234;
