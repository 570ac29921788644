//! Line Console: an interactive client for plain-text TCP command peers.
//!
//! This crate connects once to a remote peer, sends operator commands as
//! CRLF-terminated lines, and prints one reply line for every command that
//! ends in `?`. It also ships an emulator for the GPIO controller the console
//! is typically pointed at.

pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod session;
pub mod transport;

pub use config::Config;
pub use console::{Operator, ScriptedOperator, StdinOperator};
pub use device::{DeviceCommand, DeviceEmulator};
pub use error::{ConsoleError, Result};
pub use session::{is_query, Exchange, Session, SessionEnd};
pub use transport::{LineTransport, TcpLineTransport};
