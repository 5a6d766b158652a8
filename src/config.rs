use once_cell::sync::Lazy;

use crate::settings::UserSettings;

// Default values for configuration
// These serve as fallback values and can be used for "reset to defaults" functionality
pub const DEFAULT_FILTER_T1: &str = "_tp1_";
pub const DEFAULT_FILTER_T2: &str = "_tp2_";
pub const DEFAULT_CLASS: &str = "spine";
pub const DEFAULT_FRAME_SIZE: u32 = 512;
/// Confidence recorded on user-created rows.
pub const DEFAULT_SCORE: f32 = 1.0;

pub struct Config {
    pub filter_t1: String,          // Timepoint 1 filename marker
    pub filter_t2: String,          // Timepoint 2 filename marker
    pub default_class: String,      // Class label for user-created rows
    pub default_frame_size: u32,    // Frame dimensions recorded on user-created rows
    pub sync_frames: bool,          // Synchronize frame cursors on startup
    pub show_boxes: bool,           // Show the box overlay on project open
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    // Load settings from YAML file
    let settings = UserSettings::load(None);

    Config {
        filter_t1: settings.filter_t1,
        filter_t2: settings.filter_t2,
        default_class: settings.default_class,
        default_frame_size: settings.default_frame_size,
        sync_frames: settings.sync_frames,
        show_boxes: settings.show_boxes,
    }
});
