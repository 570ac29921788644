//! Line-oriented transport to the remote peer.
//!
//! Commands go out as `text\r\n` in a single write. Replies are read one line
//! at a time and handed back without their terminator.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ConsoleError, Result};

/// Terminator appended to every transmitted command
pub const LINE_TERMINATOR: &str = "\r\n";

/// Trait for line transports (real TCP or mock)
#[async_trait]
pub trait LineTransport: Send {
    /// Transmit `text` followed by the line terminator
    async fn send_line(&mut self, text: &str) -> Result<()>;

    /// Block until one full line arrives and return it without its terminator
    async fn read_line(&mut self) -> Result<String>;
}

/// Frame a command for the wire
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(LINE_TERMINATOR.as_bytes());
    buf
}

/// Strip a trailing `\n` or `\r\n`
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Read one raw line, terminator included; `None` at end of stream
pub async fn read_raw_line<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    match reader.read_line(&mut line).await? {
        0 => Ok(None), // EOF
        _ => Ok(Some(line)),
    }
}

/// Line transport over any split byte stream
pub struct StreamLineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> StreamLineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }
}

#[async_trait]
impl<R, W> LineTransport for StreamLineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_line(&mut self, text: &str) -> Result<()> {
        let frame = encode_line(text);
        self.writer
            .write_all(&frame)
            .await
            .map_err(ConsoleError::SendError)?;
        self.writer.flush().await.map_err(ConsoleError::SendError)?;
        debug!("sent {} bytes", frame.len());
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        match read_raw_line(&mut self.reader)
            .await
            .map_err(ConsoleError::ReceiveError)?
        {
            // A fragment cut off by EOF never completed
            Some(line) if line.ends_with('\n') => Ok(trim_line_ending(&line).to_string()),
            _ => Err(ConsoleError::ConnectionClosed),
        }
    }
}

/// Production transport: one outbound TCP connection
pub type TcpLineTransport = StreamLineTransport<OwnedReadHalf, OwnedWriteHalf>;

impl TcpLineTransport {
    /// Open the connection; no retry
    pub async fn connect(addr: &str) -> Result<(Self, SocketAddr)> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ConsoleError::ConnectError {
                addr: addr.to_string(),
                source,
            })?;
        let peer = stream
            .peer_addr()
            .map_err(|source| ConsoleError::ConnectError {
                addr: addr.to_string(),
                source,
            })?;
        let (read_half, write_half) = stream.into_split();
        Ok((Self::new(read_half, write_half), peer))
    }
}
