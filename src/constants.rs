//! Application-wide constants
//!
//! Magic numbers and string literals used throughout the daemon, kept in one
//! place so the store, the IPC layer and the settings file agree on them.

/// Profile keys
pub mod profile {
    /// Key of the global profile used when per-game profiles are disabled
    pub const DEFAULT_KEY: &str = "default";
}

/// Hard-coded light settings used when no "default" profile exists yet
pub mod fallback_light {
    pub const ENABLED: bool = false;
    pub const SPEED: u32 = 50;
    pub const RED: u32 = 255;
    pub const GREEN: u32 = 255;
    pub const BLUE: u32 = 255;
    pub const BRIGHTNESS: u32 = 50;
    pub const HUE: u32 = 50;
}

/// Persistence timing
pub mod persistence {
    /// Quiescence window before a save is sent to the backend
    pub const SAVE_DEBOUNCE_MS: u64 = 100;
}

/// IPC framing and socket locations
pub mod ipc {
    /// Maximum message size (10 MB) to prevent DoS via memory exhaustion
    pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

    /// Socket accepting UI commands
    pub const COMMAND_SOCKET: &str = "command.sock";

    /// Socket exposed by the hardware backend
    pub const BACKEND_SOCKET: &str = "backend.sock";

    /// Give up on a backend that stops reading mid-message
    pub const BACKEND_WRITE_TIMEOUT_MS: u64 = 500;
}

/// Configuration file locations
pub mod config {
    /// Directory under the XDG config/runtime dirs
    pub const APP_DIR: &str = "rgb-profiles";

    /// Settings filename
    pub const FILENAME: &str = "settings.json";
}
