//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\place-narrator\
//!   macOS:   ~/Library/Application Support/place-narrator/
//!   Linux:   ~/.config/place-narrator/
//!
//! Cache dir (synthesized narration):
//!   Windows: %LOCALAPPDATA%\place-narrator\
//!   macOS:   ~/Library/Caches/place-narrator/
//!   Linux:   ~/.cache/place-narrator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory the audio cache writes its single artifact into.
    pub audio_cache_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "place-narrator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let audio_cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
            audio_cache_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
