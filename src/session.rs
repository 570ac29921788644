use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::config::Config;
use crate::console::Operator;
use crate::error::{ConsoleError, Result};
use crate::transport::LineTransport;

/// Marker before each echoed outgoing command
pub const SENT_MARKER: &str = ">> ";
/// Marker before each received reply
pub const RECEIVED_MARKER: &str = "<< ";

/// A command expects a reply iff its last character is `?`
pub fn is_query(text: &str) -> bool {
    text.ends_with('?')
}

/// Outcome of one prompt/send/receive cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// The command as typed, without terminator
    pub command: String,
    /// The reply line, only for queries
    pub reply: Option<String>,
}

/// Why the session loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The operator's input stream ended
    InputClosed {
        /// Number of commands sent
        exchanges: u64,
    },
}

/// Interactive session over a single connection
///
/// Owns the transport for its whole life; the connection is never reopened.
pub struct Session<T, O, W> {
    transport: T,
    operator: O,
    output: W,
    prompt: String,
    reply_timeout: Option<Duration>,
}

impl<T, O, W> Session<T, O, W>
where
    T: LineTransport,
    O: Operator,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(transport: T, operator: O, output: W, config: &Config) -> Self {
        Self {
            transport,
            operator,
            output,
            prompt: config.prompt.clone(),
            reply_timeout: config.reply_timeout(),
        }
    }

    /// Echo, transmit and, for queries, wait for and print one reply
    pub async fn exchange(&mut self, text: &str) -> Result<Exchange> {
        self.print(SENT_MARKER, text).await?;
        self.transport.send_line(text).await?;

        if !is_query(text) {
            return Ok(Exchange {
                command: text.to_string(),
                reply: None,
            });
        }

        debug!("awaiting reply to {:?}", text);
        let reply = match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.read_line())
                .await
                .map_err(|_| ConsoleError::ReplyTimeout(limit))??,
            None => self.transport.read_line().await?,
        };
        self.print(RECEIVED_MARKER, &reply).await?;

        Ok(Exchange {
            command: text.to_string(),
            reply: Some(reply),
        })
    }

    /// Prompt and exchange until the operator's input runs out
    ///
    /// Transport failures end the loop with an error; nothing is retried.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        let mut exchanges = 0u64;

        loop {
            let Some(text) = self.operator.next_line(&self.prompt).await? else {
                info!("operator input closed after {} command(s)", exchanges);
                return Ok(SessionEnd::InputClosed { exchanges });
            };

            self.exchange(&text).await?;
            exchanges += 1;
        }
    }

    pub fn into_parts(self) -> (T, O, W) {
        (self.transport, self.operator, self.output)
    }

    async fn print(&mut self, marker: &str, text: &str) -> Result<()> {
        let line = format!("{marker}{text}\n");
        self.output
            .write_all(line.as_bytes())
            .await
            .map_err(ConsoleError::OutputError)?;
        self.output.flush().await.map_err(ConsoleError::OutputError)
    }
}
