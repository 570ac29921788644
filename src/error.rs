use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the line console
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Could not open the connection to the remote peer
    #[error("failed to connect to {addr}: {source}")]
    ConnectError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a command to the peer failed
    #[error("failed to send command: {0}")]
    SendError(#[source] std::io::Error),

    /// Reading a reply from the peer failed
    #[error("failed to receive reply: {0}")]
    ReceiveError(#[source] std::io::Error),

    /// The peer closed the stream while a reply was awaited
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No reply line arrived within the configured bound
    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),

    /// Reading operator input failed
    #[error("failed to read operator input: {0}")]
    InputError(#[source] std::io::Error),

    /// Writing to the operator's terminal failed
    #[error("failed to write console output: {0}")]
    OutputError(#[source] std::io::Error),

    /// Error reading or parsing configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The device emulator could not bind its listener
    #[error("failed to bind {addr}: {source}")]
    BindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Shutdown was requested (e.g., via Ctrl+C)
    #[error("shutdown requested")]
    ShutdownRequested,
}

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
