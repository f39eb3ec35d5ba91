/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Byte-stream adapter: serial device node or TCP socket.

use std::io;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::DeviceChannel;
use crate::error::ChannelError;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Newline-framed text over any `AsyncRead` / `AsyncWrite` pair.
///
/// Incoming bytes are decoded lossily: boards emit stray bytes on reset and
/// those must not abort a run.  A partially received line is kept in
/// `pending` across calls, which makes [`receive_line`](DeviceChannel::receive_line)
/// cancel-safe.
pub struct StreamChannel {
    label: String,
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
    pending: Vec<u8>,
}

impl StreamChannel {
    pub fn new<R, W>(label: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            label: label.into(),
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
            pending: Vec::new(),
        }
    }

    /// Open a serial device node for reading and writing.
    ///
    /// `settle` is slept after opening: most boards reset when the port opens
    /// and drop anything sent during boot.
    pub async fn open_serial(path: &Path, settle: Duration) -> Result<Self, ChannelError> {
        let label = format!("serial {}", path.display());
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .await
            .map_err(|source| ChannelError::Open {
                target: label.clone(),
                source,
            })?;
        let (reader, writer) = tokio::io::split(file);
        settle_after_open(&label, settle).await;
        Ok(Self::new(label, reader, writer))
    }

    /// Connect to a TCP endpoint (simulator or serial bridge).
    pub async fn connect_tcp(address: &str, settle: Duration) -> Result<Self, ChannelError> {
        let label = format!("tcp {address}");
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| ChannelError::Open {
                target: label.clone(),
                source,
            })?;
        let (reader, writer) = stream.into_split();
        settle_after_open(&label, settle).await;
        Ok(Self::new(label, reader, writer))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

async fn settle_after_open(label: &str, settle: Duration) {
    if !settle.is_zero() {
        debug!(link = label, settle_ms = settle.as_millis() as u64, "waiting for device to settle");
        tokio::time::sleep(settle).await;
    }
}

impl DeviceChannel for StreamChannel {
    async fn send(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    async fn receive_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.pending).await?;
        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&bytes);
        Ok(Some(text.trim_end_matches(['\n', '\r']).to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    fn pair() -> (StreamChannel, tokio::io::DuplexStream) {
        let (ours, theirs) = duplex(1024);
        let (reader, writer) = tokio::io::split(ours);
        (StreamChannel::new("test", reader, writer), theirs)
    }

    #[tokio::test]
    async fn sends_command_bytes_verbatim() {
        let (mut channel, mut device) = pair();
        channel.send("1,10,20\n").await.unwrap();

        let mut buf = [0u8; 8];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"1,10,20\n");
    }

    #[tokio::test]
    async fn splits_lines_and_strips_terminators() {
        let (mut channel, mut device) = pair();
        device.write_all(b"hola\r\nD\xc3\xada 1 completado\n").await.unwrap();

        assert_eq!(channel.receive_line().await.unwrap().as_deref(), Some("hola"));
        assert_eq!(
            channel.receive_line().await.unwrap().as_deref(),
            Some("Día 1 completado")
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let (mut channel, mut device) = pair();
        device.write_all(b"\xffPARADA\n").await.unwrap();
        let line = channel.receive_line().await.unwrap().unwrap();
        assert!(line.ends_with("PARADA"));
    }

    #[tokio::test]
    async fn closed_link_yields_none_after_partial_line() {
        let (mut channel, mut device) = pair();
        device.write_all(b"sin salto").await.unwrap();
        drop(device);

        assert_eq!(channel.receive_line().await.unwrap().as_deref(), Some("sin salto"));
        assert_eq!(channel.receive_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn timed_out_read_keeps_partial_line() {
        let (mut channel, mut device) = pair();
        device.write_all(b"Dia 2 comp").await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), channel.receive_line()).await;
        assert!(timed_out.is_err());

        device.write_all(b"letado\n").await.unwrap();
        assert_eq!(
            channel.receive_line().await.unwrap().as_deref(),
            Some("Dia 2 completado")
        );
    }

    #[tokio::test]
    async fn open_serial_reports_missing_node() {
        let err = StreamChannel::open_serial(Path::new("/nonexistent/ttyACM9"), Duration::ZERO)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/ttyACM9"));
    }
}
