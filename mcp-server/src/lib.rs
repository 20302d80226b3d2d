//! MCP server exposing the recorder over JSON-RPC on stdin/stdout.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::io::ErrorKind;
use std::io::Result as IoResult;
use std::sync::Arc;

use domtrace_browser::driver_factory;
use domtrace_core::Config;
use domtrace_core::ConfigOverrides;
use domtrace_core::RecorderService;
use mcp_types::JSONRPCMessage;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::{self};
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error_code;
mod message_processor;
mod outgoing_message;
mod tool_config;
mod tool_handlers;

use crate::message_processor::MessageProcessor;
use crate::outgoing_message::OutgoingMessage;
use crate::outgoing_message::OutgoingMessageSender;

/// Size of the bounded channel used to communicate between tasks. The value
/// is a balance between throughput and memory usage.
const CHANNEL_CAPACITY: usize = 128;

pub async fn run_main(overrides: ConfigOverrides) -> IoResult<()> {
    // stdout carries the protocol, so logs go to stderr. A host binary may
    // already have installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let config = Config::load_with_overrides(overrides).map_err(|e| {
        std::io::Error::new(ErrorKind::InvalidData, format!("error loading config: {e}"))
    })?;
    info!(
        "serving recordings from {}",
        config.recordings_dir.display()
    );
    let factory = driver_factory(&config);
    let service = Arc::new(RecorderService::new(config, factory));

    let (incoming_tx, mut incoming_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    // Task: read from stdin, push to `incoming_tx`.
    let stdin_reader_handle = tokio::spawn({
        async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            while let Some(line) = lines.next_line().await.unwrap_or_default() {
                match serde_json::from_str::<JSONRPCMessage>(&line) {
                    Ok(msg) => {
                        if incoming_tx.send(msg).await.is_err() {
                            // Receiver gone, nothing left to do.
                            break;
                        }
                    }
                    Err(e) => error!("Failed to deserialize JSONRPCMessage: {e}"),
                }
            }

            debug!("stdin reader finished (EOF)");
        }
    });

    // Task: process incoming messages until stdin closes or shutdown is
    // requested, then wait for the tool calls already started.
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let mut processor_handle = tokio::spawn({
        let outgoing_message_sender = OutgoingMessageSender::new(outgoing_tx);
        let mut processor = MessageProcessor::new(outgoing_message_sender, service.clone());
        async move {
            loop {
                tokio::select! {
                    msg = incoming_rx.recv() => {
                        let Some(msg) = msg else {
                            info!("processor task exited (channel closed)");
                            break;
                        };
                        match msg {
                            JSONRPCMessage::Request(r) => processor.process_request(r).await,
                            JSONRPCMessage::Response(r) => processor.process_response(r),
                            JSONRPCMessage::Notification(n) => processor.process_notification(n),
                            JSONRPCMessage::Error(e) => processor.process_error(e),
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("processor task stopped reading (shutdown)");
                        break;
                    }
                }
            }

            processor.drain_tool_calls().await;
        }
    });

    // Task: write outgoing messages to stdout.
    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(outgoing_message) = outgoing_rx.recv().await {
            let msg: JSONRPCMessage = outgoing_message.into();
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("Failed to write to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.write_all(b"\n").await {
                        error!("Failed to write newline to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.flush().await {
                        error!("Failed to flush stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize JSONRPCMessage: {e}"),
            }
        }

        info!("stdout writer exited (channel closed)");
    });

    tokio::select! {
        _ = &mut processor_handle => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; saving active recordings");
            let _ = shutdown_tx.send(());
            if let Err(e) = processor_handle.await {
                error!("processor task failed: {e}");
            }
        }
    }

    // Anything still capturing is saved rather than lost.
    service.shutdown().await;
    stdin_reader_handle.abort();
    let _ = stdout_writer_handle.await;

    Ok(())
}
