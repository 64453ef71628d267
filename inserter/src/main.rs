// vbit-inserter -- TCP control front end for the VBIT teletext inserter.
//
// Accepts XTP620 / Newfor control connections and applies them to an
// in-memory page list shared by every client.
//
// Usage:
//   vbit-inserter
//   vbit-inserter --port 5570 --bind 127.0.0.1
//   vbit-inserter --crlf --watch
//   RUST_LOG=debug vbit-inserter --model VBIT2

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vbit_core::{MemoryPageList, PageEvent};
use vbit_transport::TcpTransport;
use vbit_xtp620::protocol::{DEFAULT_PORT, MODEL_STRING};
use vbit_xtp620::{ConnectionHandler, ConnectionHandlerBuilder, LineEnding};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// VBIT inserter control server.
#[derive(Parser, Debug)]
#[command(name = "vbit-inserter", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// TCP port for control connections.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Terminate every response with CR LF (handy for telnet sessions).
    #[arg(long)]
    crlf: bool,

    /// Reply to the `Y` identity query.
    #[arg(long, default_value = MODEL_STRING)]
    model: String,

    /// Log every page list change.
    #[arg(long)]
    watch: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let pages = Arc::new(MemoryPageList::new());
    let cancel = CancellationToken::new();

    let line_ending = if cli.crlf {
        LineEnding::CrLf
    } else {
        LineEnding::None
    };
    let handler = ConnectionHandlerBuilder::new(pages.clone())
        .model(&cli.model)
        .line_ending(line_ending)
        .cancellation_token(cancel.clone())
        .build()
        .context("invalid handler configuration")?;

    if cli.watch {
        tokio::spawn(watch_pages(pages.subscribe(), cancel.clone()));
    }

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    info!(addr = %addr, model = %cli.model, crlf = cli.crlf, "inserter control listening");

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        shutdown.cancel();
    });

    accept_loop(listener, handler, cancel).await;

    let on_air = pages.on_air_pages().await;
    info!(on_air = on_air.len(), "inserter stopped");
    Ok(())
}

async fn accept_loop(listener: TcpListener, handler: ConnectionHandler, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => spawn_connection(stream, peer, handler.clone()),
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
}

fn spawn_connection(stream: tokio::net::TcpStream, peer: SocketAddr, handler: ConnectionHandler) {
    tokio::spawn(async move {
        let mut transport = TcpTransport::from_stream(stream, peer.to_string());
        if let Err(e) = handler.handle(&mut transport).await {
            debug!(peer = %peer, error = %e, "connection ended with error");
        }
    });
}

async fn watch_pages(mut events: tokio::sync::broadcast::Receiver<PageEvent>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(PageEvent::RowWritten { page, row, packet }) => {
                info!(page = %page, row, data = %packet.to_hex(), "row written");
            }
            Ok(PageEvent::RowsCleared { page }) => info!(page = %page, "rows cleared"),
            Ok(PageEvent::OnAir { page }) => info!(page = %page, "page on air"),
            Ok(PageEvent::OffAir { page }) => info!(page = %page, "page off air"),
            Err(RecvError::Lagged(missed)) => warn!(missed, "page watcher lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}
