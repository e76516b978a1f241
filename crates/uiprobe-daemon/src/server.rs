// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSONL-over-TCP server.
//!
//! One accepted connection gets one task, one [`Processor`], and one
//! unsolicited info banner before the first request is read.  Requests on
//! a connection are handled strictly in order; the response is flushed
//! before the next line is read.

use crate::processor::Processor;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};
use uiprobe_backend::BackendRegistry;
use uiprobe_protocol::{Envelope, ExtensionRegistry, JsonlCodec, ProtocolError};

/// Accept connections forever, serving each on its own task.
///
/// # Errors
///
/// Only listener-level failures propagate; per-connection failures are
/// logged and end that connection alone.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<BackendRegistry>,
    extensions: Arc<ExtensionRegistry>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!(peer = %peer, "accepted connection");
        let registry = Arc::clone(&registry);
        let extensions = Arc::clone(&extensions);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, registry, extensions).await {
                error!(peer = %peer, error = %err, "connection failed");
            }
            info!(peer = %peer, "closing connection");
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: Arc<BackendRegistry>,
    extensions: Arc<ExtensionRegistry>,
) -> Result<(), ProtocolError> {
    let (reader, mut writer) = stream.into_split();
    let banner = Envelope::info_banner(
        env!("CARGO_PKG_VERSION"),
        &current_locale(),
        &extensions.names(),
    );
    write_envelope(&mut writer, &banner).await?;

    let mut processor = Processor::new(registry, extensions);
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(request = line, "handling request");
        let envelope = match JsonlCodec::decode(line) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(error = %err, "dropping unparseable request line");
                continue;
            }
        };
        let response = match processor.process(&envelope).await {
            Ok(response) => response,
            Err(err @ ProtocolError::UnsupportedMessage { .. }) => {
                error!(error = %err, "unsupported message");
                Envelope::error_response(&envelope, &err.to_string())
            }
            Err(err) => {
                error!(error = %err, "request processing failure");
                Envelope::error_response(&envelope, "request processing failure")
            }
        };
        write_envelope(&mut writer, &response).await?;
    }
    Ok(())
}

async fn write_envelope(
    writer: &mut OwnedWriteHalf,
    envelope: &Envelope,
) -> Result<(), ProtocolError> {
    let line = JsonlCodec::encode(envelope)?;
    debug!(response = line.trim_end(), "sending response");
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// The machine's locale as an IETF language tag, or empty when unset.
pub(crate) fn current_locale() -> String {
    for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        let Ok(value) = std::env::var(var) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || value == "C" || value == "POSIX" {
            continue;
        }
        let tag = value.split('.').next().unwrap_or(value);
        return tag.replace('_', "-");
    }
    String::new()
}
