//! TCP front end: accepts connections and runs one session per client.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use kshell_device::DeviceHandle;

use crate::session::{AdminCredentials, Session};

/// Listening emulator front end.
///
/// Binding and running are split so callers can bind port 0 and learn the
/// real address before the first client connects.
pub struct EmulatorServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    device: DeviceHandle,
    credentials: AdminCredentials,
}

impl EmulatorServer {
    /// Bind the listening socket.
    pub async fn bind(
        addr: SocketAddr,
        device: DeviceHandle,
        credentials: AdminCredentials,
    ) -> io::Result<EmulatorServer> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(EmulatorServer {
            listener,
            local_addr,
            device,
            credentials,
        })
    }

    /// The address the server is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, one session task per client.
    ///
    /// Every session talks to the same shared device, so outlet changes made
    /// by one client are visible to all others.
    pub async fn run(self) -> io::Result<()> {
        info!(addr = %self.local_addr, "emulator listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let device = self.device.clone();
            let credentials = self.credentials.clone();
            tokio::spawn(async move {
                if let Err(error) = serve_connection(stream, peer, device, credentials).await {
                    // Peer dropped mid-line or similar; the session is over
                    // either way.
                    debug!(%peer, %error, "session transport error");
                }
            });
        }
    }
}

/// Drive one connection: send the welcome, then read, apply, and reply until
/// the session closes or the peer goes away.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    device: DeviceHandle,
    credentials: AdminCredentials,
) -> io::Result<()> {
    let mut session = Session::new(device, credentials);
    debug!(%peer, salt = %format_args!("{:X}", session.salt()), "session opened");

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    let welcome = session.welcome();
    debug!(%peer, line = %welcome.to_line(), "tx");
    write_half.write_all(&welcome.encode()).await?;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            // EOF without quit: the session ends silently, no bye line.
            session.disconnected();
            debug!(%peer, "peer closed connection");
            return Ok(());
        }

        let record = trim_terminator(&buf);
        debug!(%peer, line = %String::from_utf8_lossy(record), "rx");

        let Some(reply) = session.handle_raw(record) else {
            return Ok(());
        };
        debug!(%peer, line = %reply.to_line(), "tx");
        write_half.write_all(&reply.encode()).await?;

        if session.is_closed() {
            debug!(%peer, "session closed");
            return Ok(());
        }
    }
}

/// Strip the line terminator; tolerates a bare `\n` as well as `\r\n`.
fn trim_terminator(buf: &[u8]) -> &[u8] {
    let mut record = buf;
    while let [rest @ .., b'\r' | b'\n'] = record {
        record = rest;
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_terminator_handles_both_endings() {
        assert_eq!(trim_terminator(b"port list\r\n"), b"port list");
        assert_eq!(trim_terminator(b"port list\n"), b"port list");
        assert_eq!(trim_terminator(b"quit"), b"quit");
        assert_eq!(trim_terminator(b"\r\n"), b"");
    }
}
