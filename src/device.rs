//! Emulator for the GPIO controller the console usually talks to.
//!
//! The controller accepts a single client, greets it, and answers newline
//! delimited commands. Only the input-state query is implemented on the
//! device; everything else is answered with `Invalid Command`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};
use crate::transport::encode_line;

/// Sent to every accepted client
pub const GREETING: &str = "ESP32 Server: Connection Accepted";
/// Reply to anything the device does not understand
pub const INVALID_COMMAND: &str = "Invalid Command";
/// The device has four input pins
pub const INPUT_MASK: u8 = 0x0F;

const COMMAND_DELIMITERS: [char; 2] = [':', ' '];

/// A command understood by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// `GPIO:IN?` - report the input pin states
    GpioInQuery,
    /// `GPIO:OUT?` - report the output pin states
    GpioOutQuery,
    /// `GPIO:OUT <value>` - set the output pins
    GpioOutWrite(String),
    /// Anything else
    Invalid,
}

impl DeviceCommand {
    /// Parse one received command; components are split on `:` and space
    pub fn parse(line: &str) -> Self {
        let components: Vec<&str> = line.split(COMMAND_DELIMITERS).collect();

        if components[0] != "GPIO" || components.len() == 1 {
            return Self::Invalid;
        }

        match components[1] {
            "IN?" => Self::GpioInQuery,
            "OUT?" => Self::GpioOutQuery,
            sub => match sub.strip_prefix("OUT") {
                Some("") => Self::GpioOutWrite(components[2..].join(" ")),
                Some(value) => Self::GpioOutWrite(value.to_string()),
                None => Self::Invalid,
            },
        }
    }
}

/// The reply line the controller sends for `command`
///
/// Output pins are not wired up on the device, so both output commands are
/// rejected like unknown ones.
pub fn respond(command: &DeviceCommand, inputs: u8) -> String {
    match command {
        DeviceCommand::GpioInQuery => (inputs & INPUT_MASK).to_string(),
        DeviceCommand::GpioOutQuery | DeviceCommand::GpioOutWrite(_) | DeviceCommand::Invalid => {
            INVALID_COMMAND.to_string()
        }
    }
}

/// Single-client TCP server speaking the controller's line protocol
pub struct DeviceEmulator {
    listener: TcpListener,
    addr: String,
    inputs: u8,
}

impl DeviceEmulator {
    /// Bind the listener; `inputs` is the reported pin state
    pub async fn bind(addr: &str, inputs: u8) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ConsoleError::BindError {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            addr: addr.to_string(),
            inputs: inputs & INPUT_MASK,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|source| ConsoleError::BindError {
                addr: self.addr.clone(),
                source,
            })
    }

    /// Accept clients until a shutdown signal arrives
    pub async fn serve(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let busy = Arc::new(AtomicBool::new(false));
        info!(
            "Device emulator listening on {} (inputs = {})",
            self.local_addr()?,
            self.inputs
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            continue;
                        }
                    };

                    if busy
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        info!("Connection rejected: {}", peer);
                        drop(stream);
                        continue;
                    }

                    info!("Connection accepted: {}", peer);
                    let busy = Arc::clone(&busy);
                    let inputs = self.inputs;
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, inputs).await {
                            warn!("client {} error: {}", peer, e);
                        }
                        info!("Client disconnected: {}", peer);
                        busy.store(false, Ordering::SeqCst);
                    });
                }
                Ok(()) = shutdown_rx.recv() => {
                    info!("Device emulator shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_client(stream: TcpStream, inputs: u8) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(&encode_line(GREETING)).await?;

    // Any byte is accepted; only complete '\n'-terminated commands run
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }
        if raw.last() != Some(&b'\n') {
            debug!("discarding unterminated fragment {:?}", raw);
            break;
        }
        let line: String = String::from_utf8_lossy(&raw)
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect();
        info!("<< {}", line);

        let command = DeviceCommand::parse(&line);
        let reply = respond(&command, inputs);
        match &command {
            DeviceCommand::GpioInQuery => info!(">> {}", reply),
            DeviceCommand::GpioOutWrite(value) => {
                info!("Output write not supported (value {:?}): {}", value, line)
            }
            _ => info!("Invalid command received: {}", line),
        }
        write_half.write_all(&encode_line(&reply)).await?;
    }

    Ok(())
}
