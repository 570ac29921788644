//! End-to-end tests: console session against the device emulator over TCP.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use line_console::device::{DeviceEmulator, GREETING, INVALID_COMMAND};
use line_console::{Config, ConsoleError, ScriptedOperator, Session, SessionEnd, TcpLineTransport};

async fn start_emulator(inputs: u8) -> (SocketAddr, broadcast::Sender<()>) {
    let emulator = DeviceEmulator::bind("127.0.0.1:0", inputs).await.unwrap();
    let addr = emulator.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(emulator.serve(shutdown_rx));
    (addr, shutdown_tx)
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..Config::default()
    }
}

#[tokio::test]
async fn greeting_is_the_first_reply_line() {
    let (addr, _shutdown) = start_emulator(0b0101).await;
    let config = config_for(addr);
    let (transport, _) = TcpLineTransport::connect(&config.remote_addr()).await.unwrap();

    // The greeting sits unread in front of the first answer
    let operator = ScriptedOperator::new(["GPIO:IN?", "GPIO:IN?"]);
    let mut session = Session::new(transport, operator, Vec::new(), &config);
    let end = session.run().await.unwrap();
    assert_eq!(end, SessionEnd::InputClosed { exchanges: 2 });

    let (_, _, output) = session.into_parts();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(">> GPIO:IN?\n<< {GREETING}\n>> GPIO:IN?\n<< 5\n")
    );
}

#[tokio::test]
async fn unknown_and_output_commands_are_rejected() {
    let (addr, _shutdown) = start_emulator(3).await;
    let config = config_for(addr);
    let (transport, _) = TcpLineTransport::connect(&config.remote_addr()).await.unwrap();

    let operator = ScriptedOperator::new(["STATUS?", "GPIO:OUT?", "GPIO IN?"]);
    let mut session = Session::new(transport, operator, Vec::new(), &config);
    session.run().await.unwrap();

    let (_, _, output) = session.into_parts();
    let output = String::from_utf8(output).unwrap();
    let replies: Vec<&str> = output
        .lines()
        .filter_map(|l| l.strip_prefix("<< "))
        .collect();
    assert_eq!(replies, vec![GREETING, INVALID_COMMAND, INVALID_COMMAND]);
}

#[tokio::test]
async fn commands_are_answered_even_without_a_read() {
    let (addr, _shutdown) = start_emulator(9).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Bare carriage returns are ignored by the device
    stream.write_all(b"GPIO:RESET\r\nGP\rIO:IN?\r\n").await.unwrap();

    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    for _ in 0..3 {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        lines.push(line);
    }
    assert_eq!(
        lines,
        vec![
            format!("{GREETING}\r\n"),
            format!("{INVALID_COMMAND}\r\n"),
            "9\r\n".to_string(),
        ]
    );
}

#[tokio::test]
async fn non_utf8_bytes_are_rejected_without_dropping_the_client() {
    let (addr, _shutdown) = start_emulator(5).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut reader = BufReader::new(stream);

    let mut greeting = String::new();
    reader.read_line(&mut greeting).await.unwrap();
    assert_eq!(greeting, format!("{GREETING}\r\n"));

    // 0xFF is a telnet IAC byte
    reader
        .get_mut()
        .write_all(b"\xff\r\nGPIO:IN?\r\n")
        .await
        .unwrap();

    let mut first = String::new();
    reader.read_line(&mut first).await.unwrap();
    let mut second = String::new();
    reader.read_line(&mut second).await.unwrap();
    assert_eq!(first, format!("{INVALID_COMMAND}\r\n"));
    assert_eq!(second, "5\r\n");
}

#[tokio::test]
async fn second_client_is_refused_while_first_is_connected() {
    let (addr, _shutdown) = start_emulator(0).await;

    let first = TcpStream::connect(addr).await.unwrap();
    let mut first = BufReader::new(first);
    let mut greeting = String::new();
    first.read_line(&mut greeting).await.unwrap();
    assert_eq!(greeting, format!("{GREETING}\r\n"));

    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut buf = Vec::new();
    let read = second.read_to_end(&mut buf).await;
    assert!(buf.is_empty() || read.is_err());
}

#[tokio::test]
async fn peer_hanging_up_before_reply_is_fatal() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
    });

    let config = config_for(addr);
    let (transport, _) = TcpLineTransport::connect(&config.remote_addr()).await.unwrap();
    let operator = ScriptedOperator::new(["STATUS?", "RESET"]);
    let mut session = Session::new(transport, operator, Vec::new(), &config);

    let result = session.run().await;
    assert!(matches!(
        result,
        Err(ConsoleError::ConnectionClosed) | Err(ConsoleError::ReceiveError(_))
    ));

    let (_, operator, output) = session.into_parts();
    assert_eq!(operator.remaining(), 1);
    assert_eq!(String::from_utf8(output).unwrap(), ">> STATUS?\n");
}
