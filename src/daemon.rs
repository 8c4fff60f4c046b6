//! Command-dispatch loop
//!
//! A listener thread accepts UI connections and forwards each request to the
//! loop below, which owns the state and handles one request at a time. The
//! in-memory store is updated before the reply is sent; backend saves lag by
//! the debounce window.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::store::RgbSnapshot;
use crate::ipc::{self, CommandServer, DaemonRequest, DaemonResponse, IpcBackend};
use crate::persistence::{Backend, BackendWorker, Persistence};
use crate::state::{RgbCommand, RgbState};

/// Request paired with the channel its reply goes back on
pub type Envelope = (DaemonRequest, oneshot::Sender<DaemonResponse>);

pub struct DaemonOptions {
    pub command_socket: PathBuf,
    pub backend_socket: Option<PathBuf>,
    pub save_debounce: Duration,
    /// Snapshot applied as `setInitialState` before serving
    pub initial_snapshot: Option<RgbSnapshot>,
}

pub async fn run(options: DaemonOptions) -> Result<()> {
    let server = CommandServer::bind_to(options.command_socket)?;
    info!(socket = ?server.path(), "RGB profile daemon listening");

    let backend = options.backend_socket.map(|path| {
        info!(socket = %path.display(), "Using backend socket");
        let ipc: Arc<dyn Backend> = Arc::new(IpcBackend::new(path));
        Arc::new(BackendWorker::spawn(ipc)) as Arc<dyn Backend>
    });
    if backend.is_none() {
        warn!("No backend configured, saves and syncs are disabled");
    }

    let mut state = RgbState::new();
    if let Some(snapshot) = options.initial_snapshot {
        state.dispatch(RgbCommand::SetInitialState(snapshot));
    }
    let mut persistence = Persistence::new(backend, options.save_debounce);

    let (tx, rx) = mpsc::unbounded_channel();
    let _listener = spawn_ipc_listener(server, tx);

    serve(&mut state, &mut persistence, rx).await;
    persistence.flush();
    info!("RGB profile daemon stopped");
    Ok(())
}

/// Process requests until shutdown, Ctrl-C, or every sender is gone
pub async fn serve(
    state: &mut RgbState,
    persistence: &mut Persistence,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
) {
    loop {
        let (request, reply_tx) = tokio::select! {
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C");
                break;
            }
        };

        let shutdown = matches!(request, DaemonRequest::Shutdown);
        let response = handle_request(state, persistence, request);
        if reply_tx.send(response).is_err() {
            debug!("Client went away before reply");
        }
        if shutdown {
            info!("Received shutdown request via IPC");
            break;
        }
    }
}

pub fn handle_request(
    state: &mut RgbState,
    persistence: &mut Persistence,
    request: DaemonRequest,
) -> DaemonResponse {
    match request {
        DaemonRequest::Command(command) => {
            debug!(command = ?command, "Applying RGB command");
            match state.apply(command) {
                Ok(effects) => {
                    persistence.handle(effects, state);
                    DaemonResponse::Ready
                }
                Err(err) => {
                    error!(error = %err, "RGB command rejected");
                    DaemonResponse::Error(err.to_string())
                }
            }
        }
        DaemonRequest::GetState => DaemonResponse::State {
            snapshot: state.store.snapshot(),
            current_game_id: state.current_game_id().to_string(),
        },
        DaemonRequest::GetActiveProfile => DaemonResponse::ActiveProfile {
            key: state.active_profile_key().to_string(),
            profile: state.active_profile().ok(),
        },
        DaemonRequest::GetMode { zone } => match state.mode(zone) {
            Ok(mode) => DaemonResponse::Mode(mode),
            Err(err) => DaemonResponse::Error(err.to_string()),
        },
        DaemonRequest::Ping => DaemonResponse::Pong,
        DaemonRequest::Shutdown => DaemonResponse::Ready,
    }
}

/// Spawn IPC listener thread; every client gets its own reader thread
pub fn spawn_ipc_listener(
    server: CommandServer,
    tx: mpsc::UnboundedSender<Envelope>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            let stream = match server.accept() {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = ?e, "IPC listener crashed");
                    break;
                }
            };
            if tx.is_closed() {
                break;
            }

            let tx = tx.clone();
            std::thread::spawn(move || {
                info!("Client connected");
                if let Err(e) = handle_client(stream, &tx) {
                    warn!(error = ?e, "IPC client error");
                }
                info!("Client disconnected");
            });
        }
    })
}

fn handle_client(mut stream: UnixStream, tx: &mpsc::UnboundedSender<Envelope>) -> Result<()> {
    loop {
        let request: DaemonRequest = match ipc::read_message(&mut stream) {
            Ok(request) => request,
            Err(e) if is_disconnect(&e) => return Ok(()),
            Err(e) if is_malformed(&e) => {
                // The whole frame was consumed, so the stream is still in sync
                warn!(error = ?e, "Rejected malformed request");
                ipc::write_message(&mut stream, &DaemonResponse::Error(format!("{e:#}")))?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send((request, reply_tx))
            .context("Daemon loop is no longer running")?;
        let response = reply_rx
            .blocking_recv()
            .context("Daemon loop dropped the request")?;
        ipc::write_message(&mut stream, &response)?;
    }
}

fn is_disconnect(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == ErrorKind::UnexpectedEof)
}

fn is_malformed(err: &anyhow::Error) -> bool {
    err.downcast_ref::<serde_json::Error>().is_some()
}
