use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use log::{error, info, warn};

/// User-specific settings that persist across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// Timepoint 1 filename marker, e.g. "_tp1_"
    #[serde(default = "default_filter_t1")]
    pub filter_t1: String,

    /// Timepoint 2 filename marker, e.g. "_tp2_"
    #[serde(default = "default_filter_t2")]
    pub filter_t2: String,

    /// Class label assigned to user-created rows
    #[serde(default = "default_class")]
    pub default_class: String,

    /// Frame width/height recorded on user-created rows
    #[serde(default = "default_frame_size")]
    pub default_frame_size: u32,

    /// Synchronize the two frame cursors on startup
    #[serde(default)]
    pub sync_frames: bool,

    /// Show the box overlay as soon as a project opens
    #[serde(default)]
    pub show_boxes: bool,
}

fn default_filter_t1() -> String {
    "_tp1_".to_string()
}

fn default_filter_t2() -> String {
    "_tp2_".to_string()
}

fn default_class() -> String {
    "spine".to_string()
}

fn default_frame_size() -> u32 {
    512
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            filter_t1: default_filter_t1(),
            filter_t2: default_filter_t2(),
            default_class: default_class(),
            default_frame_size: default_frame_size(),
            sync_frames: false,
            show_boxes: false,
        }
    }
}

impl UserSettings {
    /// Path to the settings file under the platform config dir, e.g.
    /// ~/.config/trackcurator/settings.yaml on Linux.
    pub fn settings_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("trackcurator").join("settings.yaml")
    }

    /// Load settings from the YAML file, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load(custom_path: Option<&str>) -> Self {
        let path = match custom_path {
            Some(p) => {
                info!("Using custom settings path: {}", p);
                PathBuf::from(p)
            }
            None => Self::settings_path(),
        };

        if !path.exists() {
            info!("Settings file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str::<UserSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    error!("Failed to parse settings file at {:?}: {}", path, e);
                    warn!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read settings file at {:?}: {}", path, e);
                warn!("Using default settings");
                Self::default()
            }
        }
    }

    /// Write settings back to the YAML file, creating the directory if
    /// needed.
    pub fn save(&self, custom_path: Option<&str>) -> Result<(), String> {
        let path = match custom_path {
            Some(p) => PathBuf::from(p),
            None => Self::settings_path(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, contents).map_err(|e| format!("Failed to write settings: {}", e))?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}
