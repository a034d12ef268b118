//! Per-connection protocol state machine.
//!
//! A [`Session`] is I/O-free: the server feeds it the lines it received and
//! writes back whatever reply comes out. That keeps the whole protocol
//! surface testable without opening a socket.

use kshell_device::DeviceHandle;
use kshell_protocol::{challenge_response, Command, ParseError, PortSetupInfo, Response};
use tracing::debug;

// ============================================================================
// Credentials
// ============================================================================

/// Administrator account a session authenticates against.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    /// Account name checked by `login`.
    pub user: String,
    /// Password checked by `login` and folded into the `clogin` digest.
    pub password: String,
}

impl Default for AdminCredentials {
    /// The factory account, `admin`/`admin`.
    fn default() -> Self {
        AdminCredentials {
            user: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; the welcome line has not been sent yet.
    New,
    /// Welcome sent; waiting for a successful login.
    Authenticating,
    /// Login accepted; commands reach the device.
    Authenticated,
    /// Session over; no further replies are produced.
    Closed,
}

/// Protocol state for one connection against a shared [`DeviceHandle`].
///
/// State only moves forward: `New` to `Authenticating` when the welcome is
/// produced, to `Authenticated` on a successful login, to `Closed` on `quit`
/// or transport loss. A closed session answers nothing.
pub struct Session {
    state: SessionState,
    salt: u32,
    device: DeviceHandle,
    credentials: AdminCredentials,
}

impl Session {
    /// New session with a freshly drawn challenge salt.
    pub fn new(device: DeviceHandle, credentials: AdminCredentials) -> Session {
        Session::with_salt(device, credentials, rand::random())
    }

    /// New session with a caller-chosen salt.
    pub fn with_salt(device: DeviceHandle, credentials: AdminCredentials, salt: u32) -> Session {
        Session {
            state: SessionState::New,
            salt,
            device,
            credentials,
        }
    }

    /// The salt this session advertises in its welcome line.
    pub fn salt(&self) -> u32 {
        self.salt
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the session has ended.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Produce the welcome line and start waiting for a login.
    pub fn welcome(&mut self) -> Response {
        self.state = SessionState::Authenticating;
        Response::Welcome { salt: self.salt }
    }

    /// Note that the transport dropped. The session ends without a bye.
    pub fn disconnected(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Feed one record as it came off the wire, terminator already stripped.
    ///
    /// Bytes that do not decode as UTF-8 are answered like any other unknown
    /// command; garbage input must never kill the session.
    pub fn handle_raw(&mut self, bytes: &[u8]) -> Option<Response> {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.handle_line(line),
            Err(_) => self.apply(Err(ParseError::UnknownCommand)),
        }
    }

    /// Feed one received line and get the reply to send, or `None` once the
    /// session is closed.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        self.apply(Command::parse(line))
    }

    fn apply(&mut self, parsed: Result<Command, ParseError>) -> Option<Response> {
        match self.state {
            SessionState::New | SessionState::Authenticating => {
                Some(self.apply_unauthenticated(parsed))
            }
            SessionState::Authenticated => Some(self.apply_authenticated(parsed)),
            SessionState::Closed => None,
        }
    }

    /// Before login only `quit` and the two login forms do anything.
    fn apply_unauthenticated(&mut self, parsed: Result<Command, ParseError>) -> Response {
        match parsed {
            Ok(Command::Quit) => self.close(),
            Ok(Command::Login { user, password }) => {
                let accepted =
                    user == self.credentials.user && password == self.credentials.password;
                self.finish_login(accepted)
            }
            // The user field is not compared on its own; the digest already
            // covers it.
            Ok(Command::CLogin { hash, .. }) => {
                let expected = challenge_response(
                    &self.credentials.user,
                    &self.credentials.password,
                    self.salt,
                );
                self.finish_login(hash == expected)
            }
            Err(ParseError::MalformedLogin) => Response::AuthFailed,
            Ok(_) | Err(_) => Response::Forbidden,
        }
    }

    fn finish_login(&mut self, accepted: bool) -> Response {
        debug!(accepted, "login attempt");
        if accepted {
            self.state = SessionState::Authenticated;
            Response::Ok
        } else {
            // The peer may retry as often as it likes.
            Response::AuthFailed
        }
    }

    fn apply_authenticated(&mut self, parsed: Result<Command, ParseError>) -> Response {
        let command = match parsed {
            Ok(command) => command,
            Err(ParseError::UnknownCommand) => return Response::UnknownCommand,
            Err(ParseError::InvalidParameter) => return Response::InvalidParameter,
            Err(ParseError::InvalidValue) => return Response::InvalidValue,
            Err(ParseError::MalformedLogin) => return Response::AlreadyAuthenticated,
        };

        match command {
            Command::Quit => self.close(),
            Command::Login { .. } | Command::CLogin { .. } => Response::AlreadyAuthenticated,
            Command::GetVersion => Response::Version(self.device.version()),
            Command::GetAlias => Response::Alias(self.device.alias()),
            Command::SetAlias { name } => {
                self.device.set_alias(name);
                Response::Ok
            }
            Command::GetDiscover => Response::Discover(self.device.discover()),
            Command::SetDiscover { enable } => {
                self.device.set_discover(enable);
                Response::Ok
            }
            Command::GetSwdelay => Response::Swdelay(self.device.swdelay()),
            Command::SetSwdelay { delay } => {
                self.device.set_swdelay(delay);
                Response::Ok
            }
            Command::PortList => Response::PortList(self.device.outlet_states()),
            Command::PortSetup { port } => {
                let snapshot = self.device.outlet_snapshot(port.index());
                Response::PortSetup(PortSetupInfo {
                    name: snapshot.name,
                    timer_mode: snapshot.timer_enabled,
                    interrupt_delay: snapshot.interrupt_delay,
                    power_on_state: snapshot.power_on_state,
                })
            }
            Command::PortSet { port, on } => {
                self.device.set_outlet(port.index(), on);
                Response::Ok
            }
            Command::PortGet { port } => {
                Response::PortState(self.device.outlet_states()[port.index()])
            }
        }
    }

    fn close(&mut self) -> Response {
        self.state = SessionState::Closed;
        Response::Bye
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kshell_device::Device;

    const SALT: u32 = 0xDEADBEEF;

    fn session() -> Session {
        let device = DeviceHandle::new(Device::default());
        let mut session = Session::with_salt(device, AdminCredentials::default(), SALT);
        assert_eq!(session.welcome(), Response::Welcome { salt: SALT });
        session
    }

    fn authenticated() -> Session {
        let mut session = session();
        assert_eq!(session.handle_line("login admin admin"), Some(Response::Ok));
        assert_eq!(session.state(), SessionState::Authenticated);
        session
    }

    #[test]
    fn welcome_advertises_salt() {
        let device = DeviceHandle::new(Device::default());
        let mut session = Session::with_salt(device, AdminCredentials::default(), 0x2A);
        assert_eq!(session.state(), SessionState::New);
        let welcome = session.welcome();
        assert_eq!(welcome.to_line(), "100 HELLO 2A - KSHELL V1.2");
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[test]
    fn plain_login_checks_both_fields() {
        let mut session = session();
        assert_eq!(
            session.handle_line("login admin wrong"),
            Some(Response::AuthFailed)
        );
        assert_eq!(
            session.handle_line("login root admin"),
            Some(Response::AuthFailed)
        );
        assert_eq!(session.state(), SessionState::Authenticating);

        // Failed attempts do not burn the session.
        assert_eq!(session.handle_line("login admin admin"), Some(Response::Ok));
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn challenge_login_accepts_matching_digest() {
        let mut session = session();
        let digest = challenge_response("admin", "admin", SALT);
        let line = format!("clogin admin {digest}");
        assert_eq!(session.handle_line(&line), Some(Response::Ok));
    }

    #[test]
    fn challenge_login_ignores_user_field() {
        // The digest binds the account; the user token is decorative.
        let mut session = session();
        let digest = challenge_response("admin", "admin", SALT);
        let line = format!("clogin whoever {digest}");
        assert_eq!(session.handle_line(&line), Some(Response::Ok));
    }

    #[test]
    fn challenge_login_rejects_wrong_digest() {
        let mut session = session();
        let digest = challenge_response("admin", "admin", SALT ^ 1);
        let line = format!("clogin admin {digest}");
        assert_eq!(session.handle_line(&line), Some(Response::AuthFailed));
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[test]
    fn malformed_login_reads_as_failed_attempt() {
        let mut session = session();
        assert_eq!(session.handle_line("login admin"), Some(Response::AuthFailed));
        assert_eq!(session.handle_line("clogin"), Some(Response::AuthFailed));
    }

    #[test]
    fn commands_before_login_are_forbidden() {
        let mut session = session();
        for line in ["version", "alias", "port list", "port 1 1", "nonsense"] {
            assert_eq!(
                session.handle_line(line),
                Some(Response::Forbidden),
                "pre-auth line {line:?}"
            );
        }
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[test]
    fn quit_works_before_login() {
        let mut session = session();
        assert_eq!(session.handle_line("quit"), Some(Response::Bye));
        assert!(session.is_closed());
        assert_eq!(session.handle_line("version"), None);
    }

    #[test]
    fn relogin_is_rejected() {
        let mut session = authenticated();
        assert_eq!(
            session.handle_line("login admin admin"),
            Some(Response::AlreadyAuthenticated)
        );
        let digest = challenge_response("admin", "admin", SALT);
        assert_eq!(
            session.handle_line(&format!("clogin admin {digest}")),
            Some(Response::AlreadyAuthenticated)
        );
        // Even a truncated login form counts as a login attempt here.
        assert_eq!(
            session.handle_line("login admin"),
            Some(Response::AlreadyAuthenticated)
        );
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn outlet_commands_drive_the_device() {
        let mut session = authenticated();
        assert_eq!(
            session.handle_line("port list"),
            Some(Response::PortList([false; 4]))
        );
        assert_eq!(session.handle_line("port 2 1"), Some(Response::Ok));
        assert_eq!(
            session.handle_line("port list"),
            Some(Response::PortList([false, true, false, false]))
        );
        assert_eq!(session.handle_line("port 2"), Some(Response::PortState(true)));
        assert_eq!(session.handle_line("port 2 0"), Some(Response::Ok));
        assert_eq!(session.handle_line("port 2"), Some(Response::PortState(false)));
    }

    #[test]
    fn settings_round_trip() {
        let mut session = authenticated();
        assert_eq!(
            session.handle_line("version"),
            Some(Response::Version("2.33".to_string()))
        );
        assert_eq!(
            session.handle_line("alias"),
            Some(Response::Alias("Zarathustra".to_string()))
        );
        assert_eq!(session.handle_line("alias rack-7"), Some(Response::Ok));
        assert_eq!(
            session.handle_line("alias"),
            Some(Response::Alias("rack-7".to_string()))
        );

        assert_eq!(session.handle_line("system discover"), Some(Response::Discover(true)));
        assert_eq!(session.handle_line("system discover disable"), Some(Response::Ok));
        assert_eq!(session.handle_line("system discover"), Some(Response::Discover(false)));

        assert_eq!(session.handle_line("system swdelay"), Some(Response::Swdelay(15)));
        assert_eq!(session.handle_line("system swdelay 120"), Some(Response::Ok));
        assert_eq!(session.handle_line("system swdelay"), Some(Response::Swdelay(120)));
    }

    #[test]
    fn port_setup_reports_the_snapshot() {
        let mut session = authenticated();
        let reply = session.handle_line("port setup 3");
        assert_eq!(
            reply,
            Some(Response::PortSetup(PortSetupInfo {
                name: "outlet x".to_string(),
                timer_mode: false,
                interrupt_delay: 5,
                power_on_state: false,
            }))
        );
    }

    #[test]
    fn parse_errors_map_to_status_lines() {
        let mut session = authenticated();
        assert_eq!(session.handle_line("bogus"), Some(Response::UnknownCommand));
        assert_eq!(session.handle_line("port 7 1"), Some(Response::InvalidParameter));
        assert_eq!(session.handle_line("port 2 9"), Some(Response::InvalidValue));
        assert_eq!(session.handle_line("system swdelay 1000"), Some(Response::InvalidValue));
        assert_eq!(
            session.handle_line(&format!("alias {}", "x".repeat(19))),
            Some(Response::InvalidParameter)
        );
    }

    #[test]
    fn undecodable_bytes_read_as_unknown_command() {
        let mut session = session();
        assert_eq!(session.handle_raw(&[0xFF, 0xFE]), Some(Response::Forbidden));

        let mut session = authenticated();
        assert_eq!(
            session.handle_raw(&[0xFF, 0xFE]),
            Some(Response::UnknownCommand)
        );
    }

    #[test]
    fn quit_after_login_ends_the_session() {
        let mut session = authenticated();
        assert_eq!(session.handle_line("quit"), Some(Response::Bye));
        assert!(session.is_closed());
        assert_eq!(session.handle_line("port list"), None);
    }

    #[test]
    fn sessions_share_one_device() {
        let device = DeviceHandle::new(Device::default());
        let mut first = Session::with_salt(device.clone(), AdminCredentials::default(), 1);
        let mut second = Session::with_salt(device, AdminCredentials::default(), 2);
        first.welcome();
        second.welcome();
        assert_eq!(first.handle_line("login admin admin"), Some(Response::Ok));
        assert_eq!(second.handle_line("login admin admin"), Some(Response::Ok));

        assert_eq!(first.handle_line("port 4 1"), Some(Response::Ok));
        assert_eq!(
            second.handle_line("port list"),
            Some(Response::PortList([false, false, false, true]))
        );
    }
}
