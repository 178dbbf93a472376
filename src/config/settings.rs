//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Secrets are deliberately absent; see [`super::Credentials`].

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LocationConfig
// ---------------------------------------------------------------------------

/// Where the device position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    /// Coarse position from an IP geolocation service.
    IpLookup,
    /// The fixed coordinates in [`LocationConfig`].
    Fixed,
}

impl Default for LocationSource {
    fn default() -> Self {
        Self::IpLookup
    }
}

/// Stored answer to the foreground location permission question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationPermission {
    Granted,
    Denied,
}

impl Default for LocationPermission {
    fn default() -> Self {
        Self::Granted
    }
}

/// Settings for acquiring the current position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Which position source to query.
    pub source: LocationSource,
    /// Whether the user allows the app to read their position.
    pub permission: LocationPermission,
    /// Latitude used when `source = "Fixed"`.
    pub fixed_latitude: f64,
    /// Longitude used when `source = "Fixed"`.
    pub fixed_longitude: f64,
    /// IP geolocation endpoint returning `{status, lat, lon}`.
    pub ip_lookup_url: String,
    /// Seconds before a position request is reported as unavailable.
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            permission: LocationPermission::default(),
            fixed_latitude: 35.69538,
            fixed_longitude: 139.705050,
            ip_lookup_url: "http://ip-api.com/json".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// GeocoderConfig
// ---------------------------------------------------------------------------

/// GeoNames reverse-geocoding endpoint flavour.
///
/// The two endpoints cover different regions; neither is authoritative, so
/// the choice is left to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeocodeEndpoint {
    /// `findNearestIntersectionOSMJSON` — OpenStreetMap data, worldwide.
    Osm,
    /// `findNearestIntersectionJSON` — US TIGER data only.
    Nearest,
}

impl Default for GeocodeEndpoint {
    fn default() -> Self {
        Self::Osm
    }
}

/// Settings for the reverse-geocoding step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// GeoNames web service root.
    pub base_url: String,
    /// Which intersection endpoint to query.
    pub endpoint: GeocodeEndpoint,
    /// Maximum seconds to wait for a response.
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.geonames.org".into(),
            endpoint: GeocodeEndpoint::default(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// NarrativeConfig
// ---------------------------------------------------------------------------

/// Settings for the anecdote-generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Root of any OpenAI-compatible API (`/v1/chat/completions` is appended).
    pub base_url: String,
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Completion token cap; `None` leaves the provider default.
    pub max_tokens: Option<u32>,
    /// Maximum seconds to wait for a completion.
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-4-1106-preview".into(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the text-to-speech step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Root of any OpenAI-compatible API (`/v1/audio/speech` is appended).
    pub base_url: String,
    /// TTS model identifier.
    pub model: String,
    /// Voice preset.
    pub voice: String,
    /// Container/codec requested from the service.
    pub response_format: String,
    /// Maximum seconds to wait for the audio payload.
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "tts-1".into(),
            voice: "alloy".into(),
            response_format: "mp3".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Settings for the on-disk audio slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory override; `None` uses [`AppPaths::audio_cache_dir`].
    pub dir: Option<PathBuf>,
    /// File name of the single cached artifact.
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_name: "narration.mp3".into(),
        }
    }
}

impl StorageConfig {
    /// Directory the artifact lives in, after applying the override.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().audio_cache_dir)
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for audio output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Open the system output device.  When `false` clips are "played" by a
    /// silent backend, which is useful on headless machines.
    pub enabled: bool,
    /// How often the orchestrator checks whether a clip has finished.
    pub poll_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Every section falls back to its defaults when missing from the file.
///
/// ```rust,no_run
/// use place_narrator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.speech.voice, "alloy");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub location: LocationConfig,
    pub geocoder: GeocoderConfig,
    pub narrative: NarrativeConfig,
    pub speech: SpeechConfig,
    pub storage: StorageConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
