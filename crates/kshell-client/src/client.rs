//! Typed client for one device session.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use kshell_protocol::{
    challenge_response, parse_port_list, parse_welcome, Command, PortNumber, PortSetupInfo,
    Reply, ReplyError, StatusCode, OUTLET_COUNT,
};

use crate::error::ClientError;

/// A connected session with one device.
///
/// `connect` consumes the welcome line and keeps its salt; authenticate with
/// [`login`](DeviceClient::login) or [`clogin`](DeviceClient::clogin) before
/// issuing any other operation. The protocol is strictly request-reply, so
/// every operation takes `&mut self` and waits for the device's line.
pub struct DeviceClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    salt: u32,
}

impl DeviceClient {
    /// Connect to a device and read its welcome line.
    pub async fn connect(host: &str, port: u16) -> Result<DeviceClient, ClientError> {
        let stream = TcpStream::connect((host, port)).await?;
        let (read_half, writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let line = read_reply_line(&mut reader).await?;
        let salt = parse_welcome(&line)?;
        debug!(salt = %format_args!("{salt:X}"), "connected");

        Ok(DeviceClient {
            reader,
            writer,
            salt,
        })
    }

    /// The challenge salt from the welcome line.
    pub fn salt(&self) -> u32 {
        self.salt
    }

    /// Authenticate with the password sent in the clear.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<(), ClientError> {
        self.request(&Command::Login {
            user: user.to_string(),
            password: password.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Authenticate with the salted challenge digest.
    ///
    /// The digest is computed locally; the password never crosses the wire.
    pub async fn clogin(&mut self, user: &str, password: &str) -> Result<(), ClientError> {
        let hash = challenge_response(user, password, self.salt);
        self.request(&Command::CLogin {
            user: user.to_string(),
            hash,
        })
        .await?;
        Ok(())
    }

    /// Firmware version.
    pub async fn version(&mut self) -> Result<String, ClientError> {
        let reply = self.request(&Command::GetVersion).await?;
        let version = reply
            .payload
            .strip_prefix("V ")
            .ok_or_else(|| ReplyError::MalformedPayload {
                what: "version",
                text: reply.payload.clone(),
            })?;
        Ok(version.to_string())
    }

    /// Device alias.
    pub async fn alias(&mut self) -> Result<String, ClientError> {
        let reply = self.request(&Command::GetAlias).await?;
        Ok(reply.payload)
    }

    /// Rename the device.
    pub async fn set_alias(&mut self, name: &str) -> Result<(), ClientError> {
        self.request(&Command::SetAlias {
            name: name.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Whether the device answers network discovery probes.
    pub async fn discover(&mut self) -> Result<bool, ClientError> {
        let reply = self.request(&Command::GetDiscover).await?;
        match reply.payload.as_str() {
            "enable" => Ok(true),
            "disable" => Ok(false),
            _ => Err(ReplyError::MalformedPayload {
                what: "discover",
                text: reply.payload.clone(),
            }
            .into()),
        }
    }

    /// Enable or disable discovery answers.
    pub async fn set_discover(&mut self, enable: bool) -> Result<(), ClientError> {
        self.request(&Command::SetDiscover { enable }).await?;
        Ok(())
    }

    /// Outlet switch delay in seconds.
    pub async fn swdelay(&mut self) -> Result<u16, ClientError> {
        let reply = self.request(&Command::GetSwdelay).await?;
        let delay = reply
            .payload
            .trim()
            .parse::<u16>()
            .map_err(|_| ReplyError::MalformedPayload {
                what: "swdelay",
                text: reply.payload.clone(),
            })?;
        Ok(delay)
    }

    /// Change the outlet switch delay.
    pub async fn set_swdelay(&mut self, delay: u16) -> Result<(), ClientError> {
        self.request(&Command::SetSwdelay { delay }).await?;
        Ok(())
    }

    /// All outlet states, outlet 1 first.
    pub async fn outlet_states(&mut self) -> Result<[bool; OUTLET_COUNT], ClientError> {
        let reply = self.request(&Command::PortList).await?;
        Ok(parse_port_list(&reply.payload)?)
    }

    /// One outlet's state.
    pub async fn outlet_state(&mut self, port: PortNumber) -> Result<bool, ClientError> {
        let reply = self.request(&Command::PortGet { port }).await?;
        match reply.payload.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(ReplyError::MalformedPayload {
                what: "port state",
                text: reply.payload.clone(),
            }
            .into()),
        }
    }

    /// Switch one outlet on or off.
    pub async fn set_outlet(&mut self, port: PortNumber, on: bool) -> Result<(), ClientError> {
        self.request(&Command::PortSet { port, on }).await?;
        Ok(())
    }

    /// One outlet's configuration summary.
    pub async fn outlet_setup(&mut self, port: PortNumber) -> Result<PortSetupInfo, ClientError> {
        let reply = self.request(&Command::PortSetup { port }).await?;
        Ok(PortSetupInfo::parse(&reply.payload)?)
    }

    /// End the session cleanly, waiting for the device's bye line.
    pub async fn quit(mut self) -> Result<(), ClientError> {
        let reply = self.request(&Command::Quit).await?;
        if reply.status != StatusCode::Bye {
            return Err(ReplyError::UnexpectedStatus {
                expected: "bye",
                line: format!("{} {}", reply.status.code(), reply.payload),
            }
            .into());
        }
        Ok(())
    }

    /// Split into raw transport halves, for callers that relay lines
    /// themselves.
    pub fn into_parts(self) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
        (self.reader, self.writer)
    }

    /// Send one command and wait for its reply line.
    ///
    /// Error status lines become [`ClientError`] variants; only 100/110/250
    /// replies come back as values.
    async fn request(&mut self, command: &Command) -> Result<Reply, ClientError> {
        debug!(line = %command.to_line(), "tx");
        self.writer.write_all(&command.encode()).await?;

        let line = read_reply_line(&mut self.reader).await?;
        debug!(line = %line, "rx");

        let reply = Reply::parse(&line)?;
        match reply.status {
            StatusCode::Hello | StatusCode::Bye | StatusCode::Ok => Ok(reply),
            StatusCode::InvalidValue => Err(ClientError::InvalidValue),
            StatusCode::InvalidParameter => Err(ClientError::InvalidParameter),
            StatusCode::UnknownCommand => Err(ClientError::UnknownCommand),
            StatusCode::AuthFailed => Err(ClientError::AuthenticationFailed),
            StatusCode::AlreadyAuthenticated => Err(ClientError::AlreadyAuthenticated),
            StatusCode::Forbidden => Err(ClientError::NotAuthenticated),
        }
    }
}

/// Read one reply line, terminator stripped.
async fn read_reply_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String, ClientError> {
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(ClientError::ConnectionClosed);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}
