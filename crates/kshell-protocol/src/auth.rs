//! Challenge-response authentication pieces.
//!
//! The welcome line carries a per-session salt. A `clogin` proves knowledge
//! of the credentials without putting the password on the wire: the client
//! sends the lowercase hex MD5 digest of `user + password + salt`, with the
//! salt formatted exactly as the welcome line printed it.

use md5::{Digest, Md5};

use crate::error::ReplyError;
use crate::responses::{Reply, StatusCode};

/// Format a session salt the way the welcome line does: uppercase hex,
/// no leading-zero padding, no prefix.
pub fn salt_hex(salt: u32) -> String {
    format!("{:X}", salt)
}

/// Compute the `clogin` hash for the given credentials and session salt.
pub fn challenge_response(user: &str, password: &str, salt: u32) -> String {
    let mut hasher = Md5::new();
    hasher.update(user.as_bytes());
    hasher.update(password.as_bytes());
    hasher.update(salt_hex(salt).as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the session salt from a welcome line.
pub fn parse_welcome(line: &str) -> Result<u32, ReplyError> {
    let reply = Reply::parse(line)?;
    if reply.status != StatusCode::Hello {
        return Err(ReplyError::UnexpectedStatus {
            expected: "welcome",
            line: line.to_string(),
        });
    }

    // Payload shape: HELLO <SALT-HEX> - KSHELL V1.2
    let malformed = || ReplyError::MalformedPayload {
        what: "welcome",
        text: reply.payload.clone(),
    };
    let mut tokens = reply.payload.split_whitespace();
    if tokens.next() != Some("HELLO") {
        return Err(malformed());
    }
    let salt_token = tokens.next().ok_or_else(malformed)?;
    u32::from_str_radix(salt_token, 16).map_err(|_| malformed())
}
