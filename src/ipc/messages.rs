//! IPC message types for UI ↔ daemon ↔ backend communication

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::store::RgbSnapshot;
use crate::state::RgbCommand;
use crate::types::{ProfilePair, RgbMode, Zone};

/// Requests sent from a UI client to the daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DaemonRequest {
    /// Apply a mutation command or transition event
    Command(RgbCommand),

    /// Query the whole store plus the current game id
    GetState,

    /// Query the profile reads and writes currently target
    GetActiveProfile,

    /// Query the lighting mode of one zone of the active profile
    GetMode { zone: Zone },

    /// Health check
    Ping,

    /// Request graceful shutdown
    Shutdown,
}

/// Responses sent from the daemon to a UI client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DaemonResponse {
    /// Request was processed
    Ready,

    State {
        snapshot: RgbSnapshot,
        current_game_id: String,
    },

    ActiveProfile {
        key: String,
        profile: Option<ProfilePair>,
    },

    Mode(RgbMode),

    Pong,

    /// Command was rejected (e.g. profile never bootstrapped)
    Error(String),
}

/// Fire-and-forget requests from the daemon to the backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "method", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackendRequest {
    Save {
        rgb_profiles: HashMap<String, ProfilePair>,
        current_game_id: String,
    },

    Sync {
        current_game_id: String,
    },
}
