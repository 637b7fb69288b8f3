use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::scene::light::{DIRECTIONAL_LIGHT_COUNT, MAX_LIGHTS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub vsync: bool,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub window: Resolution,
    /// Fixed render resolution. The window viewport is letterboxed around it.
    #[serde(default)]
    pub target: Option<Resolution>,
    #[serde(default)]
    pub shadow: ShadowSettings,
    #[serde(default = "RenderSettings::default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default = "RenderSettings::default_point_lights")]
    pub point_lights: u32,
    #[serde(default = "RenderSettings::default_show_point_lights")]
    pub show_point_lights: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            vsync: false,
            fullscreen: false,
            window: Resolution::default(),
            target: None,
            shadow: ShadowSettings::default(),
            clear_color: Self::default_clear_color(),
            point_lights: Self::default_point_lights(),
            show_point_lights: Self::default_show_point_lights(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load_from_path(path) {
            Ok(settings) => {
                info!("Loaded render settings from {:?}", path);
                settings.validate()
            }
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "{} ({:?}). Falling back to default render settings.",
                    err, path
                );
                RenderSettings::default()
            }
        }
    }

    pub fn try_load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn validate(mut self) -> Self {
        if self.window.width == 0 || self.window.height == 0 {
            warn!("Window resolution must be greater than zero. Using default resolution.");
            self.window = Resolution::default();
        }

        if let Some(target) = &self.target {
            if target.width == 0 || target.height == 0 {
                warn!("Target resolution must be greater than zero. Filling the window instead.");
                self.target = None;
            }
        }

        self.shadow = self.shadow.validate();

        let max_point_lights = (MAX_LIGHTS - DIRECTIONAL_LIGHT_COUNT) as u32;
        if self.point_lights > max_point_lights {
            warn!(
                "Point light count {} exceeds the light buffer. Clamping to {}.",
                self.point_lights, max_point_lights
            );
            self.point_lights = max_point_lights;
        }

        self
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.4, 0.6, 0.75, 1.0]
    }

    const fn default_point_lights() -> u32 {
        20
    }

    const fn default_show_point_lights() -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Directional shadow map configuration. Changing `resolution` at runtime
/// means recreating the shadow resources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub resolution: u32,
    pub depth_bias: i32,
    pub slope_bias: f32,
    pub projection_size: f32,
    pub light_distance: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 2048,
            depth_bias: 1000,
            slope_bias: 1.0,
            projection_size: 15.0,
            light_distance: 20.0,
            near: 1.0,
            far: 100.0,
        }
    }
}

impl ShadowSettings {
    fn validate(mut self) -> Self {
        let defaults = Self::default();

        if self.resolution == 0 {
            warn!("Shadow map resolution must be greater than zero. Using default value.");
            self.resolution = defaults.resolution;
        }

        if self.projection_size <= 0.0 {
            warn!("Shadow projection size must be positive. Using default value.");
            self.projection_size = defaults.projection_size;
        }

        if self.near <= 0.0 || self.far <= self.near {
            warn!(
                "Invalid shadow clip range {}..{}. Using default range.",
                self.near, self.far
            );
            self.near = defaults.near;
            self.far = defaults.far;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> RenderSettings {
        RenderSettings {
            window: Resolution::new(0, 0),
            target: Some(Resolution::new(640, 0)),
            shadow: ShadowSettings {
                resolution: 0,
                projection_size: -1.0,
                near: 5.0,
                far: 1.0,
                ..ShadowSettings::default()
            },
            point_lights: 500,
            ..RenderSettings::default()
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();
        let defaults = ShadowSettings::default();

        assert_eq!(validated.window, Resolution::default());
        assert!(validated.target.is_none());
        assert_eq!(validated.shadow.resolution, defaults.resolution);
        assert_eq!(validated.shadow.projection_size, defaults.projection_size);
        assert_eq!(validated.shadow.near, defaults.near);
        assert_eq!(validated.shadow.far, defaults.far);
        assert_eq!(
            validated.point_lights,
            (MAX_LIGHTS - DIRECTIONAL_LIGHT_COUNT) as u32
        );
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = RenderSettings {
            vsync: true,
            window: Resolution::new(1920, 1080),
            target: Some(Resolution::new(1280, 720)),
            shadow: ShadowSettings {
                resolution: 1024,
                ..ShadowSettings::default()
            },
            point_lights: 8,
            ..RenderSettings::default()
        };

        let validated = valid.clone().validate();

        assert!(validated.vsync);
        assert_eq!(validated.window, valid.window);
        assert_eq!(validated.target, valid.target);
        assert_eq!(validated.shadow, valid.shadow);
        assert_eq!(validated.point_lights, 8);
    }

    #[test]
    fn shadow_defaults_match_documented_constants() {
        let shadow = ShadowSettings::default();
        assert_eq!(shadow.resolution, 2048);
        assert_eq!(shadow.depth_bias, 1000);
        assert_eq!(shadow.slope_bias, 1.0);
        assert_eq!(shadow.projection_size, 15.0);
        assert_eq!(shadow.light_distance, 20.0);
        assert_eq!((shadow.near, shadow.far), (1.0, 100.0));
    }

    #[test]
    fn partial_json_fills_missing_fields() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "vsync": true, "shadow": { "resolution": 512 } }"#)
                .expect("parse settings");

        assert!(settings.vsync);
        assert_eq!(settings.shadow.resolution, 512);
        assert_eq!(settings.shadow.depth_bias, 1000);
        assert_eq!(settings.window, Resolution::default());
        assert!(settings.show_point_lights);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = RenderSettings::load_from_path("definitely/not/here/settings.json");
        assert_eq!(settings.window, Resolution::default());
        assert!(!settings.vsync);
    }
}
