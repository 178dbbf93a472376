//! Configuration module for place-narrator.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each pipeline
//! stage, `AppPaths` for cross-platform directories, `Credentials` for the
//! secrets read from the environment, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod credentials;
pub mod paths;
pub mod settings;

pub use credentials::Credentials;
pub use paths::AppPaths;
pub use settings::{
    AppConfig, GeocodeEndpoint, GeocoderConfig, LocationConfig, LocationPermission,
    LocationSource, NarrativeConfig, PlaybackConfig, SpeechConfig, StorageConfig,
};
