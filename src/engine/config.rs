use std::path::Path;
use serde::{Serialize, Deserialize, de::DeserializeOwned};

use crate::{
    log,
    utils::coords::ZoomLevel,
};

// ----------------------------------------------
// Configs
// ----------------------------------------------

pub trait Configs {
    fn post_load(&mut self) {
    }

    fn to_json(&self) -> Result<String, String>
        where Self: Sized + Serialize
    {
        serde_json::to_string_pretty(self).map_err(|err| err.to_string())
    }

    fn from_json<T>(json: &str) -> Result<T, String>
        where T: Configs + Sized + DeserializeOwned
    {
        let mut configs: T = serde_json::from_str(json).map_err(|err| err.to_string())?;
        configs.post_load();
        Ok(configs)
    }

    // Saves current configs to file.
    fn save_file(&self, config_json_path: &Path) -> bool
        where Self: Configs + Sized + Serialize
    {
        let json = match self.to_json() {
            Ok(json) => json,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to serialize config file {config_json_path:?}: {err}");
                return false;
            }
        };

        if let Some(parent) = config_json_path.parent() {
            // Ignore errors here, the write below reports anything that matters.
            let _ = std::fs::create_dir_all(parent);
        }

        if let Err(err) = std::fs::write(config_json_path, json) {
            log::error!(log::channel!("config"), "Failed to write config file {config_json_path:?}: {err}");
            return false;
        }

        true
    }

    // Either succeeds loading the config file or returns a default config.
    fn load_file<T>(config_json_path: &Path) -> T
        where T: Configs + Sized + Default + DeserializeOwned
    {
        let json = match std::fs::read_to_string(config_json_path) {
            Ok(json) => json,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to read config file from path {config_json_path:?}: {err}");
                return T::default();
            }
        };

        match T::from_json::<T>(&json) {
            Ok(configs) => configs,
            Err(err) => {
                log::error!(log::channel!("config"), "Failed to deserialize config file from path {config_json_path:?}: {err}");
                T::default()
            }
        }
    }
}

// ----------------------------------------------
// ViewportConfigs
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)] // Missing fields in the config file get defaults from ViewportConfigs::default().
pub struct ViewportConfigs {
    // Viewports:
    pub always_show_gridlines: bool,
    pub max_viewports: usize,

    // Camera:
    pub zoom_to_cursor: bool,
    pub min_zoom: ZoomLevel,
    pub max_zoom: ZoomLevel,

    // Rendering:
    pub render_weather_gloom: bool,

    // Debug Log:
    pub log_level: log::Level,
}

impl ViewportConfigs {
    pub const DEFAULT_MAX_VIEWPORTS: usize = 16;

    #[inline]
    pub fn clamp_zoom(&self, zoom: ZoomLevel) -> ZoomLevel {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Configs for ViewportConfigs {
    fn post_load(&mut self) {
        if self.max_viewports == 0 {
            log::warn!(log::channel!("config"), "max_viewports must be at least 1, using {}.", Self::DEFAULT_MAX_VIEWPORTS);
            self.max_viewports = Self::DEFAULT_MAX_VIEWPORTS;
        }

        if self.min_zoom > self.max_zoom {
            log::warn!(log::channel!("config"), "min_zoom {} is above max_zoom {}, swapping.", self.min_zoom, self.max_zoom);
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
    }
}

impl Default for ViewportConfigs {
    fn default() -> Self {
        Self {
            // Viewports:
            always_show_gridlines: false,
            max_viewports: Self::DEFAULT_MAX_VIEWPORTS,

            // Camera:
            zoom_to_cursor: true,
            min_zoom: ZoomLevel::new(0),
            max_zoom: ZoomLevel::MAX,

            // Rendering:
            render_weather_gloom: true,

            // Debug Log:
            log_level: log::Level::Verbose,
        }
    }
}

#[cfg(test)]
mod tests;
