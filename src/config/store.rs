//! RGB profile store
//!
//! Maps an application id to its pair of zone configs. The `"default"` key
//! holds the global profile used whenever per-game profiles are off; every
//! other key is created lazily the first time that game becomes active.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::constants::profile::DEFAULT_KEY;
use crate::types::{ProfilePair, ProfilePatch};

/// Snapshot exchanged with the backend (startup hydration and saves)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbSnapshot {
    #[serde(default)]
    pub rgb: Option<HashMap<String, ProfilePair>>,
    #[serde(rename = "rgbPerGameProfilesEnabled", default)]
    pub per_game_profiles_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStore {
    profiles: HashMap<String, ProfilePair>,
    per_game_profiles_enabled: bool,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app_id: &str) -> Option<&ProfilePair> {
        self.profiles.get(app_id)
    }

    pub(crate) fn get_mut(&mut self, app_id: &str) -> Option<&mut ProfilePair> {
        self.profiles.get_mut(app_id)
    }

    pub fn set(&mut self, app_id: impl Into<String>, pair: ProfilePair) {
        self.profiles.insert(app_id.into(), pair);
    }

    pub fn profiles(&self) -> &HashMap<String, ProfilePair> {
        &self.profiles
    }

    pub fn per_game_profiles_enabled(&self) -> bool {
        self.per_game_profiles_enabled
    }

    /// Raw flag setter. Callers switching the active profile should go
    /// through [`ProfileStore::set_per_game_profiles_enabled`] instead.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.per_game_profiles_enabled = enabled;
    }

    /// Toggle per-game profiles, bootstrapping the current game when enabling
    /// so the resolver can index it right away.
    pub fn set_per_game_profiles_enabled(&mut self, enabled: bool, current_app_id: &str) {
        self.set_enabled(enabled);
        info!(enabled, game_id = %current_app_id, "Per-game RGB profiles toggled");
        if enabled {
            self.bootstrap(current_app_id);
        }
    }

    /// Deep-merge partial profiles. Only the leaves present in the patch are
    /// written; an unknown app id is seeded like a bootstrap first.
    pub fn merge(&mut self, partial: &HashMap<String, ProfilePatch>) {
        for (app_id, patch) in partial {
            let seed = self.seed();
            let pair = self.profiles.entry(app_id.clone()).or_insert_with(|| {
                debug!(game_id = %app_id, "Merge target missing, seeding from default");
                seed
            });
            pair.apply_patch(patch);
        }
    }

    /// Replace profiles and the per-game flag wholesale.
    /// The snapshot is trusted as-is; an absent map becomes an empty one.
    pub fn hydrate(&mut self, snapshot: RgbSnapshot) {
        self.profiles = snapshot.rgb.unwrap_or_default();
        self.per_game_profiles_enabled = snapshot.per_game_profiles_enabled;
        info!(
            profiles = self.profiles.len(),
            per_game = self.per_game_profiles_enabled,
            "Hydrated RGB profiles from snapshot"
        );
    }

    pub fn snapshot(&self) -> RgbSnapshot {
        RgbSnapshot {
            rgb: Some(self.profiles.clone()),
            per_game_profiles_enabled: self.per_game_profiles_enabled,
        }
    }

    /// Lazily create the profile for `app_id`.
    ///
    /// The global profile is always ensured; a game profile is created only
    /// while per-game profiles are enabled. Existing entries are never
    /// overwritten, so repeated calls are no-ops.
    pub fn bootstrap(&mut self, app_id: &str) {
        let wanted = app_id == DEFAULT_KEY || self.per_game_profiles_enabled;
        if !wanted || self.profiles.contains_key(app_id) {
            return;
        }

        let seed = self.seed();
        info!(game_id = %app_id, "Creating RGB profile");
        self.set(app_id, seed);
    }

    /// Copy of the global profile, or the hard-coded fallback for both zones
    fn seed(&self) -> ProfilePair {
        self.profiles.get(DEFAULT_KEY).copied().unwrap_or_default()
    }
}
