//! Lighting data model shared by the store, the reducer and IPC

use serde::{Deserialize, Serialize};

use crate::constants::fallback_light;

/// One of the two independently lit controller halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    Left,
    Right,
}

/// Lighting effect. The mode decides whether RGB or hue is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RgbMode {
    #[default]
    Solid,
    Pulse,
    Dynamic,
    Spiral,
}

/// Single color channel for `setColor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

/// Per-zone light settings.
/// Values are stored as given; range checks belong to whoever produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightConfig {
    pub enabled: bool,
    pub mode: RgbMode,
    pub speed: u32,
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub brightness: u32,
    pub hue: u32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            enabled: fallback_light::ENABLED,
            mode: RgbMode::Solid,
            speed: fallback_light::SPEED,
            red: fallback_light::RED,
            green: fallback_light::GREEN,
            blue: fallback_light::BLUE,
            brightness: fallback_light::BRIGHTNESS,
            hue: fallback_light::HUE,
        }
    }
}

/// Settable field plus its typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum LightField {
    Enabled(bool),
    Mode(RgbMode),
    Speed(u32),
    Red(u32),
    Green(u32),
    Blue(u32),
    Brightness(u32),
    Hue(u32),
}

impl LightField {
    /// Field selector for a single color channel
    pub fn channel(channel: ColorChannel, value: u32) -> Self {
        match channel {
            ColorChannel::Red => LightField::Red(value),
            ColorChannel::Green => LightField::Green(value),
            ColorChannel::Blue => LightField::Blue(value),
        }
    }
}

impl LightConfig {
    pub fn set(&mut self, field: LightField) {
        match field {
            LightField::Enabled(v) => self.enabled = v,
            LightField::Mode(v) => self.mode = v,
            LightField::Speed(v) => self.speed = v,
            LightField::Red(v) => self.red = v,
            LightField::Green(v) => self.green = v,
            LightField::Blue(v) => self.blue = v,
            LightField::Brightness(v) => self.brightness = v,
            LightField::Hue(v) => self.hue = v,
        }
    }

    /// Overwrite only the fields present in `patch`
    pub fn apply_patch(&mut self, patch: &LightConfigPatch) {
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.mode {
            self.mode = v;
        }
        if let Some(v) = patch.speed {
            self.speed = v;
        }
        if let Some(v) = patch.red {
            self.red = v;
        }
        if let Some(v) = patch.green {
            self.green = v;
        }
        if let Some(v) = patch.blue {
            self.blue = v;
        }
        if let Some(v) = patch.brightness {
            self.brightness = v;
        }
        if let Some(v) = patch.hue {
            self.hue = v;
        }
    }
}

/// Both zone configs of one profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilePair {
    #[serde(rename = "LEFT")]
    pub left: LightConfig,
    #[serde(rename = "RIGHT")]
    pub right: LightConfig,
}

impl ProfilePair {
    pub fn zone(&self, zone: Zone) -> &LightConfig {
        match zone {
            Zone::Left => &self.left,
            Zone::Right => &self.right,
        }
    }

    pub fn zone_mut(&mut self, zone: Zone) -> &mut LightConfig {
        match zone {
            Zone::Left => &mut self.left,
            Zone::Right => &mut self.right,
        }
    }

    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(left) = &patch.left {
            self.left.apply_patch(left);
        }
        if let Some(right) = &patch.right {
            self.right.apply_patch(right);
        }
    }
}

/// Partial `LightConfig` used by `updateRgbProfiles`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RgbMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub green: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blue: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u32>,
}

/// Partial `ProfilePair`; absent zones are left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(rename = "LEFT", default, skip_serializing_if = "Option::is_none")]
    pub left: Option<LightConfigPatch>,
    #[serde(rename = "RIGHT", default, skip_serializing_if = "Option::is_none")]
    pub right: Option<LightConfigPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_light_config() {
        let config = LightConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.mode, RgbMode::Solid);
        assert_eq!(config.speed, 50);
        assert_eq!((config.red, config.green, config.blue), (255, 255, 255));
        assert_eq!(config.brightness, 50);
        assert_eq!(config.hue, 50);
    }

    #[test]
    fn test_profile_pair_json_shape() {
        let json = serde_json::to_value(ProfilePair::default()).unwrap();
        assert_eq!(json["LEFT"]["mode"], "SOLID");
        assert_eq!(json["RIGHT"]["brightness"], 50);
        assert_eq!(json["LEFT"]["enabled"], false);
    }

    #[test]
    fn test_apply_patch_keeps_missing_fields() {
        let mut config = LightConfig {
            red: 1,
            green: 2,
            blue: 3,
            ..LightConfig::default()
        };
        let patch: LightConfigPatch = serde_json::from_str(r#"{"brightness":80}"#).unwrap();
        config.apply_patch(&patch);

        assert_eq!((config.red, config.green, config.blue), (1, 2, 3));
        assert_eq!(config.brightness, 80);
        assert_eq!(config.hue, 50);
    }

    #[test]
    fn test_profile_patch_single_zone() {
        let mut pair = ProfilePair::default();
        let patch: ProfilePatch = serde_json::from_str(r#"{"RIGHT":{"mode":"SPIRAL"}}"#).unwrap();
        pair.apply_patch(&patch);

        assert_eq!(pair.right.mode, RgbMode::Spiral);
        assert_eq!(pair.left, LightConfig::default());
    }

    #[test]
    fn test_light_field_channel() {
        let mut config = LightConfig::default();
        config.set(LightField::channel(ColorChannel::Green, 7));
        assert_eq!(config.green, 7);
        assert_eq!(config.red, 255);
    }

    #[test]
    fn test_light_field_wire_format() {
        let field: LightField = serde_json::from_str(r#"{"field":"brightness","value":70}"#).unwrap();
        assert_eq!(field, LightField::Brightness(70));
    }
}
