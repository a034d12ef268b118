//! Commands understood by the device, and their wire encoding.
//!
//! The grammar is one command per line:
//!
//! - `quit`
//! - `login <user> <password>` / `clogin <user> <md5hex>`
//! - `version`
//! - `alias` / `alias <name>`
//! - `system discover` / `system discover <enable|disable>`
//! - `system swdelay` / `system swdelay <0..999>`
//! - `port list` / `port setup <1..4>` / `port <1..4> <0|1>` / `port <1..4>`
//!
//! Commands are case-sensitive. Parameter validation happens here at parse
//! time; the session never sees an out-of-range alias, delay or outlet
//! number.

use crate::error::ParseError;
use crate::LINE_ENDING;

/// Number of switchable outlets on the device.
pub const OUTLET_COUNT: usize = 4;

/// Longest alias the device accepts, in characters.
pub const MAX_ALIAS_LEN: usize = 18;

/// Largest accepted switch delay value.
pub const MAX_SWDELAY: u16 = 999;

/// Outlet number as written on the wire (1 through 4).
///
/// Constructing one proves the range check already happened, so everything
/// downstream of the parser can index outlets without revalidating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortNumber(u8);

impl PortNumber {
    /// Build from a wire number. Returns `None` outside 1..=4.
    pub fn new(wire: u8) -> Option<PortNumber> {
        if (1..=OUTLET_COUNT as u8).contains(&wire) {
            Some(PortNumber(wire))
        } else {
            None
        }
    }

    /// The 1-based number as written on the wire.
    pub fn wire(&self) -> u8 {
        self.0
    }

    /// The 0-based index into the outlet array.
    pub fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// All outlet numbers in wire order.
    pub fn all() -> [PortNumber; OUTLET_COUNT] {
        [PortNumber(1), PortNumber(2), PortNumber(3), PortNumber(4)]
    }
}

impl std::fmt::Display for PortNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ========== Session Commands ==========
    /// End the session.
    Quit,

    /// Plaintext authentication.
    Login {
        /// Administrator user name.
        user: String,
        /// Administrator password, in the clear.
        password: String,
    },

    /// Challenge-hash authentication (see [`challenge_response`]).
    ///
    /// [`challenge_response`]: crate::challenge_response
    CLogin {
        /// Administrator user name.
        user: String,
        /// Lowercase hex MD5 of `user + password + salt`.
        hash: String,
    },

    // ========== Device Settings ==========
    /// Read the firmware version.
    GetVersion,

    /// Read the device alias.
    GetAlias,

    /// Set the device alias (at most [`MAX_ALIAS_LEN`] characters).
    SetAlias {
        /// New alias; a single word, length already validated.
        name: String,
    },

    /// Read whether network discovery answers are enabled.
    GetDiscover,

    /// Enable or disable network discovery answers.
    SetDiscover {
        /// True to enable.
        enable: bool,
    },

    /// Read the outlet switch delay.
    GetSwdelay,

    /// Set the outlet switch delay (0..=[`MAX_SWDELAY`]).
    SetSwdelay {
        /// New delay value, already validated.
        delay: u16,
    },

    // ========== Outlet Commands ==========
    /// Read all four outlet states as one bit string.
    PortList,

    /// Read one outlet's name, mode, interrupt delay and power-on state.
    PortSetup {
        /// Which outlet.
        port: PortNumber,
    },

    /// Switch one outlet on or off.
    PortSet {
        /// Which outlet.
        port: PortNumber,
        /// True for on.
        on: bool,
    },

    /// Read one outlet's state.
    PortGet {
        /// Which outlet.
        port: PortNumber,
    },
}

impl Command {
    /// Parse one received line, with the terminator already stripped.
    ///
    /// Surrounding whitespace is ignored and token runs collapse. Every
    /// malformed input maps to a typed [`ParseError`]; parsing never
    /// panics.
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        // Trailing tokens after an exact form fall through to
        // UnknownCommand, which is what the device does.
        match tokens.as_slice() {
            ["quit"] => Ok(Command::Quit),
            ["version"] => Ok(Command::GetVersion),

            ["login", user, password, ..] => Ok(Command::Login {
                user: (*user).to_string(),
                password: (*password).to_string(),
            }),
            ["login", ..] => Err(ParseError::MalformedLogin),
            ["clogin", user, hash, ..] => Ok(Command::CLogin {
                user: (*user).to_string(),
                hash: (*hash).to_string(),
            }),
            ["clogin", ..] => Err(ParseError::MalformedLogin),

            ["alias"] => Ok(Command::GetAlias),
            // The alias is a single word; anything after it is ignored.
            ["alias", name, ..] => {
                if name.chars().count() > MAX_ALIAS_LEN {
                    Err(ParseError::InvalidParameter)
                } else {
                    Ok(Command::SetAlias {
                        name: (*name).to_string(),
                    })
                }
            }

            ["system", "discover"] => Ok(Command::GetDiscover),
            // Only the first character of the value counts: "e"/"enable"/
            // "egg" all enable, "d..." disables.
            ["system", "discover", value, ..] => match value.chars().next() {
                Some('e') => Ok(Command::SetDiscover { enable: true }),
                Some('d') => Ok(Command::SetDiscover { enable: false }),
                _ => Err(ParseError::InvalidValue),
            },

            ["system", "swdelay"] => Ok(Command::GetSwdelay),
            ["system", "swdelay", value, ..] => parse_swdelay(value),

            ["port"] => Err(ParseError::InvalidParameter),
            ["port", "list"] => Ok(Command::PortList),
            ["port", "setup", rest @ ..] => {
                let port = rest
                    .first()
                    .and_then(|t| t.parse::<u8>().ok())
                    .and_then(PortNumber::new)
                    .ok_or(ParseError::InvalidParameter)?;
                Ok(Command::PortSetup { port })
            }
            // A lone outlet number is a state read.
            ["port", number] => {
                let port = parse_port(number)?;
                Ok(Command::PortGet { port })
            }
            ["port", number, state, ..] => {
                let port = parse_port(number)?;
                match *state {
                    "0" => Ok(Command::PortSet { port, on: false }),
                    "1" => Ok(Command::PortSet { port, on: true }),
                    _ => Err(ParseError::InvalidValue),
                }
            }

            _ => Err(ParseError::UnknownCommand),
        }
    }

    /// Render the command as a wire line, without the terminator.
    pub fn to_line(&self) -> String {
        match self {
            Command::Quit => "quit".to_string(),
            Command::Login { user, password } => format!("login {} {}", user, password),
            Command::CLogin { user, hash } => format!("clogin {} {}", user, hash),
            Command::GetVersion => "version".to_string(),
            Command::GetAlias => "alias".to_string(),
            Command::SetAlias { name } => format!("alias {}", name),
            Command::GetDiscover => "system discover".to_string(),
            Command::SetDiscover { enable } => {
                format!("system discover {}", if *enable { "enable" } else { "disable" })
            }
            Command::GetSwdelay => "system swdelay".to_string(),
            Command::SetSwdelay { delay } => format!("system swdelay {}", delay),
            Command::PortList => "port list".to_string(),
            Command::PortSetup { port } => format!("port setup {}", port),
            Command::PortSet { port, on } => format!("port {} {}", port, u8::from(*on)),
            Command::PortGet { port } => format!("port {}", port),
        }
    }

    /// Encode as the bytes to send, including the `\r\n` terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_line().into_bytes();
        bytes.extend_from_slice(LINE_ENDING.as_bytes());
        bytes
    }
}

fn parse_port(token: &str) -> Result<PortNumber, ParseError> {
    token
        .parse::<u8>()
        .ok()
        .and_then(PortNumber::new)
        .ok_or(ParseError::InvalidParameter)
}

fn parse_swdelay(token: &str) -> Result<Command, ParseError> {
    // Digits only: no sign, no whitespace, no suffix.
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidValue);
    }
    match token.parse::<u16>() {
        Ok(delay) if delay <= MAX_SWDELAY => Ok(Command::SetSwdelay { delay }),
        _ => Err(ParseError::InvalidValue),
    }
}
