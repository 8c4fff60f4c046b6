//! RGB state container and command reducer
//!
//! Commands are applied one at a time, synchronously, against the owned
//! store. Each successful command reports which backend side effects it
//! needs; the daemon loop performs them after the state is updated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::resolver;
use crate::config::store::{ProfileStore, RgbSnapshot};
use crate::constants::profile::DEFAULT_KEY;
use crate::error::ProfileResult;
use crate::types::{ColorChannel, LightField, ProfilePair, ProfilePatch, RgbMode, Zone};

/// Mutation commands and transition events accepted by the daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RgbCommand {
    /// Hydrate from a backend snapshot at startup
    SetInitialState(RgbSnapshot),

    /// The foreground game changed
    SetCurrentGameId { id: String },

    SetPerGameProfilesEnabled { enabled: bool },

    SetRgbMode { zone: Zone, mode: RgbMode },

    SetSpeed { zone: Zone, speed: u32 },

    /// Deep-merge partial profiles keyed by game id
    UpdateRgbProfiles { profiles: HashMap<String, ProfilePatch> },

    SetColor { zone: Zone, channel: ColorChannel, value: u32 },

    SetRgbColor { zone: Zone, red: u32, green: u32, blue: u32, hue: u32 },

    SetEnabled { zone: Zone, enabled: bool },

    SetBrightness { zone: Zone, brightness: u32 },

    SetHue { zone: Zone, hue: u32 },
}

impl RgbCommand {
    /// Everything but startup hydration is written back to the backend
    fn persists(&self) -> bool {
        !matches!(self, RgbCommand::SetInitialState(_))
    }

    /// Game switches and on/off toggles push to hardware immediately
    fn syncs(&self) -> bool {
        matches!(
            self,
            RgbCommand::SetCurrentGameId { .. }
                | RgbCommand::SetEnabled { .. }
                | RgbCommand::SetPerGameProfilesEnabled { .. }
        )
    }
}

/// Backend work due after a command was applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Schedule a debounced save of the whole profile map
    pub save: bool,
    /// Send an immediate sync for the current game
    pub sync: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RgbState {
    pub store: ProfileStore,
    current_game_id: String,
}

impl Default for RgbState {
    fn default() -> Self {
        Self::new()
    }
}

impl RgbState {
    /// Empty store with the global profile bootstrapped
    pub fn new() -> Self {
        let mut store = ProfileStore::new();
        store.bootstrap(DEFAULT_KEY);
        Self {
            store,
            current_game_id: DEFAULT_KEY.to_string(),
        }
    }

    pub fn current_game_id(&self) -> &str {
        &self.current_game_id
    }

    pub fn active_profile_key(&self) -> &str {
        resolver::active_profile_key(&self.store, &self.current_game_id)
    }

    /// Both zones of the active profile, read through the resolver
    pub fn active_profile(&self) -> ProfileResult<ProfilePair> {
        let game = self.current_game_id.as_str();
        Ok(ProfilePair {
            left: *resolver::zone_config(&self.store, game, Zone::Left)?,
            right: *resolver::zone_config(&self.store, game, Zone::Right)?,
        })
    }

    pub fn mode(&self, zone: Zone) -> ProfileResult<RgbMode> {
        resolver::mode(&self.store, &self.current_game_id, zone)
    }

    /// Apply one command. On error nothing was changed and no effect is due.
    pub fn apply(&mut self, command: RgbCommand) -> ProfileResult<Effects> {
        let effects = Effects {
            save: command.persists(),
            sync: command.syncs(),
        };
        let game = self.current_game_id.as_str();
        let store = &mut self.store;

        match command {
            RgbCommand::SetInitialState(snapshot) => {
                store.hydrate(snapshot);
                store.bootstrap(DEFAULT_KEY);
                store.bootstrap(game);
            }
            RgbCommand::SetCurrentGameId { id } => {
                info!(game_id = %id, previous = %game, "Current game changed");
                store.bootstrap(&id);
                self.current_game_id = id;
            }
            RgbCommand::SetPerGameProfilesEnabled { enabled } => {
                store.set_per_game_profiles_enabled(enabled, game);
            }
            RgbCommand::SetRgbMode { zone, mode } => {
                resolver::set_field(store, game, zone, LightField::Mode(mode))?;
            }
            RgbCommand::SetSpeed { zone, speed } => {
                resolver::set_field(store, game, zone, LightField::Speed(speed))?;
            }
            RgbCommand::UpdateRgbProfiles { profiles } => {
                store.merge(&profiles);
            }
            RgbCommand::SetColor { zone, channel, value } => {
                resolver::set_field(store, game, zone, LightField::channel(channel, value))?;
            }
            RgbCommand::SetRgbColor { zone, red, green, blue, hue } => {
                resolver::set_rgb_color(store, game, zone, red, green, blue, hue)?;
            }
            RgbCommand::SetEnabled { zone, enabled } => {
                resolver::set_field(store, game, zone, LightField::Enabled(enabled))?;
            }
            RgbCommand::SetBrightness { zone, brightness } => {
                resolver::set_field(store, game, zone, LightField::Brightness(brightness))?;
            }
            RgbCommand::SetHue { zone, hue } => {
                resolver::set_hue(store, game, zone, hue)?;
            }
        }

        Ok(effects)
    }

    /// Apply a command, logging and swallowing ordering errors
    pub fn dispatch(&mut self, command: RgbCommand) -> Effects {
        self.apply(command).unwrap_or_else(|err| {
            warn!(error = %err, "Dropped RGB command");
            Effects::default()
        })
    }
}
