use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use line_console::config::Config;
use line_console::console::{Operator, ScriptedOperator, StdinOperator};
use line_console::device::DeviceEmulator;
use line_console::error::ConsoleError;
use line_console::session::{Session, SessionEnd};
use line_console::transport::TcpLineTransport;

/// Line Console: send commands to a TCP peer and read replies to queries
#[derive(Parser, Debug)]
#[command(name = "line-console")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Remote host (default: 192.168.1.100)
    #[arg(long = "host")]
    host: Option<String>,

    /// Remote port (default: 23)
    #[arg(long = "port")]
    port: Option<u16>,

    /// Give up waiting for a reply after this many milliseconds
    #[arg(long = "reply-timeout")]
    reply_timeout: Option<u64>,

    /// Send this command instead of prompting (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Config file (TOML format)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run a local emulator of the GPIO controller
    Emulate {
        /// Address to listen on
        #[arg(short = 'b', long = "bind", default_value = "127.0.0.1:2323")]
        bind: String,

        /// Input pin state to report (0-15)
        #[arg(short = 'i', long = "inputs", default_value_t = 0)]
        inputs: u8,
    },
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("line_console=debug,info")
    } else {
        EnvFilter::new("line_console=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, ConsoleError> {
    // Start with default config or load from file
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    config.merge_cli_args(cli.host.clone(), cli.port, cli.reply_timeout);
    Ok(config)
}

async fn run_session<O: Operator>(config: Config, operator: O) -> Result<SessionEnd, ConsoleError> {
    let addr = config.remote_addr();
    let (transport, peer) = TcpLineTransport::connect(&addr).await?;
    info!("Connected to {}", peer);

    let mut session = Session::new(transport, operator, tokio::io::stdout(), &config);
    session.run().await
}

async fn run(
    cli: &Cli,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<SessionEnd, ConsoleError> {
    let config = load_config(cli)?;

    let session = async {
        if cli.commands.is_empty() {
            run_session(config, StdinOperator::stdin()).await
        } else {
            run_session(config, ScriptedOperator::new(cli.commands.clone())).await
        }
    };

    tokio::select! {
        result = session => result,
        Ok(()) = shutdown_rx.recv() => {
            warn!("Shutdown signal received");
            Err(ConsoleError::ShutdownRequested)
        }
    }
}

async fn emulate(
    bind: &str,
    inputs: u8,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ConsoleError> {
    let emulator = DeviceEmulator::bind(bind, inputs).await?;
    emulator.serve(shutdown_rx).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Setup shutdown signal handling
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down...");
        let _ = shutdown_tx.send(());
    });

    if let Some(Mode::Emulate { ref bind, inputs }) = cli.mode {
        if let Err(e) = emulate(bind, inputs, shutdown_rx).await {
            error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    match run(&cli, shutdown_rx).await {
        Ok(SessionEnd::InputClosed { exchanges }) => {
            info!("Session ended after {} command(s)", exchanges);
            std::process::exit(0);
        }
        Err(ConsoleError::ShutdownRequested) => {
            eprintln!("\n{} Shutdown requested", "INTERRUPTED:".yellow().bold());
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
