//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Two channels use the same framing (length-prefixed JSON):
//! - the command socket, where UI clients send [`DaemonRequest`]s to the daemon
//! - the backend socket, where the daemon sends save/sync requests

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod messages;
pub use messages::{BackendRequest, DaemonRequest, DaemonResponse};

use crate::constants::config::APP_DIR;
use crate::constants::ipc::{BACKEND_WRITE_TIMEOUT_MS, MAX_MESSAGE_SIZE};
use crate::persistence::Backend;
use crate::types::ProfilePair;

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path(name: &str) -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(APP_DIR).join(name));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(APP_DIR).join(name))
}

/// Client connection to the daemon's command socket
pub struct DaemonClient {
    pub(crate) stream: UnixStream,
}

impl DaemonClient {
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to daemon at {}", path.display()))?;
        Ok(Self { stream })
    }

    pub fn send_request(&mut self, req: &DaemonRequest) -> Result<()> {
        write_message(&mut self.stream, req)
    }

    pub fn recv_response(&mut self) -> Result<DaemonResponse> {
        read_message(&mut self.stream)
    }

    /// Send request and wait for response
    pub fn request(&mut self, req: DaemonRequest) -> Result<DaemonResponse> {
        self.send_request(&req)?;
        self.recv_response()
    }
}

/// Command socket listener owned by the daemon
pub struct CommandServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl CommandServer {
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept incoming connection (blocking)
    pub fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept()
            .context("Failed to accept IPC connection")?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Backend reached over its Unix socket. Each call opens a fresh connection
/// so a restarted backend is picked up without reconnect logic.
pub struct IpcBackend {
    socket_path: PathBuf,
    write_timeout: Duration,
}

impl IpcBackend {
    pub fn new(socket_path: PathBuf) -> Self {
        Self::with_timeout(socket_path, Duration::from_millis(BACKEND_WRITE_TIMEOUT_MS))
    }

    pub fn with_timeout(socket_path: PathBuf, write_timeout: Duration) -> Self {
        Self {
            socket_path,
            write_timeout,
        }
    }

    fn send(&self, req: &BackendRequest) -> Result<()> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .context(format!("Failed to connect to backend at {}", self.socket_path.display()))?;
        stream
            .set_write_timeout(Some(self.write_timeout))
            .context("Failed to set backend write timeout")?;
        write_message(&mut stream, req)
    }
}

impl Backend for IpcBackend {
    fn save(&self, rgb_profiles: &HashMap<String, ProfilePair>, current_game_id: &str) -> Result<()> {
        self.send(&BackendRequest::Save {
            rgb_profiles: rgb_profiles.clone(),
            current_game_id: current_game_id.to_string(),
        })
    }

    fn sync(&self, current_game_id: &str) -> Result<()> {
        self.send(&BackendRequest::Sync {
            current_game_id: current_game_id.to_string(),
        })
    }
}

/// Write length-prefixed message to stream
pub(crate) fn write_message<T: Serialize>(stream: &mut impl Write, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
pub(crate) fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut impl Read) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
