//! Interactive pass-through shell.
//!
//! Relays stdin lines to the device verbatim and prints every line the
//! device sends back. A background task owns the receive side; a
//! cancellation token ties the two directions together so that either end
//! going away stops the other.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::ClientError;

/// Relay lines between stdin and an open session until either side ends.
///
/// Returns when stdin reaches EOF, the device closes the connection (after
/// a `quit`, say), or the transport fails.
pub async fn run(client: DeviceClient) -> Result<(), ClientError> {
    let (device_reader, mut device_writer) = client.into_parts();
    let cancel = CancellationToken::new();

    let printer = tokio::spawn(print_device_lines(device_reader, cancel.clone()));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),

            line = stdin.next_line() => match line? {
                // EOF on stdin: ask the device to end the session and give
                // the reader a moment to print the bye line.
                None => {
                    let _ = device_writer.write_all(b"quit\r\n").await;
                    let _ = tokio::time::timeout(
                        Duration::from_secs(2),
                        cancel.cancelled(),
                    )
                    .await;
                    break Ok(());
                }
                Some(line) => {
                    device_writer.write_all(line.as_bytes()).await?;
                    device_writer.write_all(b"\r\n").await?;
                }
            },
        }
    };

    cancel.cancel();
    let _ = printer.await;
    result
}

/// Print device lines until the connection closes, then cancel the relay.
async fn print_device_lines(mut reader: BufReader<OwnedReadHalf>, cancel: CancellationToken) {
    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            _ = cancel.cancelled() => return,

            read = reader.read_line(&mut line) => match read {
                Ok(0) | Err(_) => {
                    debug!("device connection closed");
                    cancel.cancel();
                    return;
                }
                Ok(_) => println!("{}", line.trim_end_matches(|c| c == '\r' || c == '\n')),
            },
        }
    }
}
