//! Reply lines sent by the device, and their client-side parse.
//!
//! Every reply is a single line: a three-digit status class, a space, and
//! an optional payload. [`Response`] is the device side (emulator) and
//! renders exact wire lines; [`Reply`] is the client side and splits a
//! received line into status class plus payload text, which the caller
//! interprets per operation.

use crate::auth::salt_hex;
use crate::commands::OUTLET_COUNT;
use crate::error::ReplyError;
use crate::LINE_ENDING;

/// Payload of a `port setup` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSetupInfo {
    /// Outlet name as configured on the device.
    pub name: String,
    /// True when the outlet is driven by its timer rather than manually.
    pub timer_mode: bool,
    /// Interrupt delay in seconds.
    pub interrupt_delay: u16,
    /// State the outlet returns to after device power-up.
    pub power_on_state: bool,
}

impl PortSetupInfo {
    /// Parse a `port setup` payload: `"<name>" <timer|manual> <delay> <0|1>`.
    pub fn parse(payload: &str) -> Result<PortSetupInfo, ReplyError> {
        let malformed = || ReplyError::MalformedPayload {
            what: "port setup",
            text: payload.to_string(),
        };

        let rest = payload.strip_prefix('"').ok_or_else(malformed)?;
        let (name, rest) = rest.split_once('"').ok_or_else(malformed)?;

        let mut fields = rest.split_whitespace();
        let timer_mode = match fields.next() {
            Some("timer") => true,
            Some("manual") => false,
            _ => return Err(malformed()),
        };
        let interrupt_delay = fields
            .next()
            .and_then(|t| t.parse::<u16>().ok())
            .ok_or_else(malformed)?;
        let power_on_state = match fields.next() {
            Some("0") => false,
            Some("1") => true,
            _ => return Err(malformed()),
        };

        Ok(PortSetupInfo {
            name: name.to_string(),
            timer_mode,
            interrupt_delay,
            power_on_state,
        })
    }
}

/// One reply as produced by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Session opener carrying the challenge salt.
    Welcome {
        /// Per-session salt echoed into the `clogin` digest.
        salt: u32,
    },

    /// Session end acknowledgement.
    Bye,

    /// Plain success.
    Ok,

    /// Firmware version.
    Version(String),

    /// Device alias.
    Alias(String),

    /// Discovery setting.
    Discover(bool),

    /// Switch delay setting.
    Swdelay(u16),

    /// All outlet states, outlet 1 first.
    PortList([bool; OUTLET_COUNT]),

    /// One outlet's state.
    PortState(bool),

    /// One outlet's configuration summary.
    PortSetup(PortSetupInfo),

    /// A value token failed validation.
    InvalidValue,

    /// A parameter was missing or out of range.
    InvalidParameter,

    /// The command was not recognized.
    UnknownCommand,

    /// Login or challenge hash did not match.
    AuthFailed,

    /// A login attempt on an already authenticated session.
    AlreadyAuthenticated,

    /// Command issued before authentication.
    Forbidden,
}

impl Response {
    /// Render the exact wire line, without the terminator.
    pub fn to_line(&self) -> String {
        match self {
            Response::Welcome { salt } => {
                format!("100 HELLO {} - KSHELL V1.2", salt_hex(*salt))
            }
            Response::Bye => "110 BYE".to_string(),
            Response::Ok => "250 OK".to_string(),
            Response::Version(version) => format!("250 V {}", version),
            Response::Alias(alias) => format!("250 {}", alias),
            Response::Discover(enabled) => {
                format!("250 {}", if *enabled { "enable" } else { "disable" })
            }
            Response::Swdelay(delay) => format!("250 {}", delay),
            Response::PortList(states) => {
                let bits: String = states.iter().map(|on| if *on { '1' } else { '0' }).collect();
                format!("250 {}", bits)
            }
            Response::PortState(on) => format!("250 {}", u8::from(*on)),
            Response::PortSetup(info) => format!(
                "250 \"{}\" {} {} {}",
                info.name,
                if info.timer_mode { "timer" } else { "manual" },
                info.interrupt_delay,
                u8::from(info.power_on_state),
            ),
            Response::InvalidValue => "500 INVALID VALUE".to_string(),
            // The firmware really does spell it this way.
            Response::InvalidParameter => "501 INVALID PARAMETR".to_string(),
            Response::UnknownCommand => "502 UNKNOWN COMMAND".to_string(),
            Response::AuthFailed => "503 INVALID LOGIN".to_string(),
            Response::AlreadyAuthenticated => "504 ALREADY LOGGED IN".to_string(),
            Response::Forbidden => "505 FORBIDDEN".to_string(),
        }
    }

    /// Encode as the bytes to send, including the `\r\n` terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.to_line().into_bytes();
        bytes.extend_from_slice(LINE_ENDING.as_bytes());
        bytes
    }
}

/// Status code class of a reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 100: welcome, carries the session salt.
    Hello,
    /// 110: session end.
    Bye,
    /// 250: success, optionally with a payload.
    Ok,
    /// 500: a value failed validation.
    InvalidValue,
    /// 501: a parameter was missing or out of range.
    InvalidParameter,
    /// 502: the command was not recognized.
    UnknownCommand,
    /// 503: authentication failed.
    AuthFailed,
    /// 504: the session is already authenticated.
    AlreadyAuthenticated,
    /// 505: command issued before authentication.
    Forbidden,
}

impl StatusCode {
    /// Map a numeric status to its class.
    pub fn from_code(code: u16) -> Option<StatusCode> {
        match code {
            100 => Some(StatusCode::Hello),
            110 => Some(StatusCode::Bye),
            250 => Some(StatusCode::Ok),
            500 => Some(StatusCode::InvalidValue),
            501 => Some(StatusCode::InvalidParameter),
            502 => Some(StatusCode::UnknownCommand),
            503 => Some(StatusCode::AuthFailed),
            504 => Some(StatusCode::AlreadyAuthenticated),
            505 => Some(StatusCode::Forbidden),
            _ => None,
        }
    }

    /// The numeric status for this class.
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Hello => 100,
            StatusCode::Bye => 110,
            StatusCode::Ok => 250,
            StatusCode::InvalidValue => 500,
            StatusCode::InvalidParameter => 501,
            StatusCode::UnknownCommand => 502,
            StatusCode::AuthFailed => 503,
            StatusCode::AlreadyAuthenticated => 504,
            StatusCode::Forbidden => 505,
        }
    }
}

/// One received reply line, split into status class and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status class from the line's numeric prefix.
    pub status: StatusCode,
    /// Everything after the status code and the separating space.
    pub payload: String,
}

impl Reply {
    /// Parse a reply line (terminator already stripped).
    pub fn parse(line: &str) -> Result<Reply, ReplyError> {
        let line = line.trim_end();
        let (code_text, payload) = match line.split_once(' ') {
            Some((code, rest)) => (code, rest),
            None => (line, ""),
        };

        let code: u16 = code_text.parse().map_err(|_| ReplyError::MissingStatus {
            line: line.to_string(),
        })?;
        let status = StatusCode::from_code(code).ok_or_else(|| ReplyError::UnknownStatus {
            code,
            line: line.to_string(),
        })?;

        Ok(Reply {
            status,
            payload: payload.to_string(),
        })
    }

    /// True for a 250 reply.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::Ok
    }
}

/// Parse a `port list` payload (dense bit string) into outlet states.
pub fn parse_port_list(payload: &str) -> Result<[bool; OUTLET_COUNT], ReplyError> {
    let malformed = || ReplyError::MalformedPayload {
        what: "port list",
        text: payload.to_string(),
    };

    let payload = payload.trim();
    if payload.len() != OUTLET_COUNT {
        return Err(malformed());
    }

    let mut states = [false; OUTLET_COUNT];
    for (slot, bit) in states.iter_mut().zip(payload.chars()) {
        *slot = match bit {
            '0' => false,
            '1' => true,
            _ => return Err(malformed()),
        };
    }
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_line() {
        let line = Response::Welcome { salt: 0x2A }.to_line();
        assert_eq!(line, "100 HELLO 2A - KSHELL V1.2");
    }

    #[test]
    fn test_welcome_line_unpadded_salt() {
        assert_eq!(
            Response::Welcome { salt: 0 }.to_line(),
            "100 HELLO 0 - KSHELL V1.2"
        );
        assert_eq!(
            Response::Welcome { salt: 0xDEADBEEF }.to_line(),
            "100 HELLO DEADBEEF - KSHELL V1.2"
        );
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Response::Ok.encode(), b"250 OK\r\n");
        assert_eq!(Response::Bye.to_line(), "110 BYE");
        assert_eq!(Response::InvalidValue.to_line(), "500 INVALID VALUE");
        assert_eq!(Response::InvalidParameter.to_line(), "501 INVALID PARAMETR");
        assert_eq!(Response::UnknownCommand.to_line(), "502 UNKNOWN COMMAND");
        assert_eq!(Response::AuthFailed.to_line(), "503 INVALID LOGIN");
        assert_eq!(Response::AlreadyAuthenticated.to_line(), "504 ALREADY LOGGED IN");
        assert_eq!(Response::Forbidden.to_line(), "505 FORBIDDEN");
    }

    #[test]
    fn test_payload_lines() {
        assert_eq!(Response::Version("2.33".to_string()).to_line(), "250 V 2.33");
        assert_eq!(Response::Alias("rack-7".to_string()).to_line(), "250 rack-7");
        assert_eq!(Response::Discover(true).to_line(), "250 enable");
        assert_eq!(Response::Discover(false).to_line(), "250 disable");
        assert_eq!(Response::Swdelay(15).to_line(), "250 15");
        assert_eq!(Response::PortState(true).to_line(), "250 1");
    }

    #[test]
    fn test_port_list_bit_order() {
        let line = Response::PortList([true, false, false, true]).to_line();
        assert_eq!(line, "250 1001");
    }

    #[test]
    fn test_port_setup_line() {
        let info = PortSetupInfo {
            name: "outlet x".to_string(),
            timer_mode: false,
            interrupt_delay: 5,
            power_on_state: false,
        };
        assert_eq!(Response::PortSetup(info).to_line(), "250 \"outlet x\" manual 5 0");
    }

    #[test]
    fn test_reply_parse() {
        let reply = Reply::parse("250 OK").unwrap();
        assert_eq!(reply.status, StatusCode::Ok);
        assert_eq!(reply.payload, "OK");
        assert!(reply.is_ok());

        let reply = Reply::parse("503 INVALID LOGIN").unwrap();
        assert_eq!(reply.status, StatusCode::AuthFailed);
        assert!(!reply.is_ok());

        let reply = Reply::parse("110 BYE").unwrap();
        assert_eq!(reply.status, StatusCode::Bye);
    }

    #[test]
    fn test_reply_parse_rejects_garbage() {
        assert!(matches!(
            Reply::parse("hello there"),
            Err(ReplyError::MissingStatus { .. })
        ));
        assert!(matches!(
            Reply::parse("999 WHAT"),
            Err(ReplyError::UnknownStatus { code: 999, .. })
        ));
    }

    #[test]
    fn test_parse_port_list_payload() {
        assert_eq!(parse_port_list("0000").unwrap(), [false; 4]);
        assert_eq!(parse_port_list("1000").unwrap(), [true, false, false, false]);
        assert!(parse_port_list("101").is_err());
        assert!(parse_port_list("10x0").is_err());
    }

    #[test]
    fn test_parse_port_setup_payload() {
        let info = PortSetupInfo::parse("\"outlet x\" manual 5 0").unwrap();
        assert_eq!(info.name, "outlet x");
        assert!(!info.timer_mode);
        assert_eq!(info.interrupt_delay, 5);
        assert!(!info.power_on_state);

        let info = PortSetupInfo::parse("\"pump\" timer 30 1").unwrap();
        assert!(info.timer_mode);
        assert!(info.power_on_state);

        assert!(PortSetupInfo::parse("pump timer 30 1").is_err());
        assert!(PortSetupInfo::parse("\"pump\" sometimes 30 1").is_err());
    }

    #[test]
    fn test_setup_line_round_trip() {
        let info = PortSetupInfo {
            name: "heater".to_string(),
            timer_mode: true,
            interrupt_delay: 12,
            power_on_state: true,
        };
        let line = Response::PortSetup(info.clone()).to_line();
        let reply = Reply::parse(&line).unwrap();
        assert_eq!(PortSetupInfo::parse(&reply.payload).unwrap(), info);
    }
}
