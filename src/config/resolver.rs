//! Active-profile resolution and field mutation
//!
//! Every read and write goes through [`active_profile_key`] so that a write
//! is always visible to the next read. The target profile must already exist;
//! bootstrapping it is the caller's job on every game id change and every
//! per-game toggle.

use tracing::debug;

use crate::config::store::ProfileStore;
use crate::constants::profile::DEFAULT_KEY;
use crate::error::{ProfileError, ProfileResult};
use crate::types::{LightConfig, LightField, RgbMode, Zone};

/// Key of the profile that reads and writes target right now
pub fn active_profile_key<'a>(store: &ProfileStore, current_app_id: &'a str) -> &'a str {
    if store.per_game_profiles_enabled() {
        current_app_id
    } else {
        DEFAULT_KEY
    }
}

pub fn zone_config<'s>(
    store: &'s ProfileStore,
    current_app_id: &str,
    zone: Zone,
) -> ProfileResult<&'s LightConfig> {
    let key = active_profile_key(store, current_app_id);
    store
        .get(key)
        .map(|pair| pair.zone(zone))
        .ok_or_else(|| not_found(key, zone))
}

pub fn mode(store: &ProfileStore, current_app_id: &str, zone: Zone) -> ProfileResult<RgbMode> {
    zone_config(store, current_app_id, zone).map(|config| config.mode)
}

fn zone_config_mut<'s>(
    store: &'s mut ProfileStore,
    current_app_id: &str,
    zone: Zone,
) -> ProfileResult<&'s mut LightConfig> {
    let key = active_profile_key(store, current_app_id);
    store
        .get_mut(key)
        .map(|pair| pair.zone_mut(zone))
        .ok_or_else(|| not_found(key, zone))
}

/// Single mutation primitive; the specific setters below all funnel here
pub fn set_field(
    store: &mut ProfileStore,
    current_app_id: &str,
    zone: Zone,
    field: LightField,
) -> ProfileResult<()> {
    let config = zone_config_mut(store, current_app_id, zone)?;
    config.set(field);
    debug!(game_id = %current_app_id, zone = ?zone, field = ?field, "RGB field updated");
    Ok(())
}

/// Write all three channels and the hue in one step. Nothing is written if
/// the active profile is missing.
pub fn set_rgb_color(
    store: &mut ProfileStore,
    current_app_id: &str,
    zone: Zone,
    red: u32,
    green: u32,
    blue: u32,
    hue: u32,
) -> ProfileResult<()> {
    let config = zone_config_mut(store, current_app_id, zone)?;
    config.red = red;
    config.green = green;
    config.blue = blue;
    config.hue = hue;
    debug!(game_id = %current_app_id, zone = ?zone, red, green, blue, hue, "RGB color updated");
    Ok(())
}

pub fn set_hue(store: &mut ProfileStore, current_app_id: &str, zone: Zone, hue: u32) -> ProfileResult<()> {
    set_field(store, current_app_id, zone, LightField::Hue(hue))
}

fn not_found(key: &str, zone: Zone) -> ProfileError {
    ProfileError::NotFound {
        key: key.to_string(),
        zone,
    }
}
