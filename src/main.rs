//! Application entry point — place-narrator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] from disk (returns default on first run) and apply
//!    command-line overrides.
//! 4. Read [`Credentials`] from the environment.
//! 5. Open the audio output (silent backend when disabled or unavailable).
//! 6. Build the stage clients and the [`PipelineOrchestrator`].
//! 7. Either run once, or read triggers from stdin until `q`, EOF or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use place_narrator::{
    cache::AudioCache,
    config::{AppConfig, Credentials, LocationSource},
    geocode::GeoNamesResolver,
    location::{Coordinates, GatedPosition},
    narrative::ChatNarrator,
    pipeline::{LogObserver, PipelineOrchestrator, PipelineStatus, RunOutcome, Stages},
    playback::{AudioOutput, Player, RodioOutput, SilentOutput},
    speech::OpenAiSpeech,
};

/// Speak a short anecdote about the nearest street intersection.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Settings file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the pipeline once and exit.
    #[arg(long)]
    once: bool,

    /// Fixed latitude (skips position lookup).
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Fixed longitude (skips position lookup).
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Do not open an audio device.
    #[arg(long)]
    no_audio: bool,
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("cannot read config {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        if Coordinates::new(lat, lon).is_none() {
            bail!("coordinates out of range: {lat}, {lon}");
        }
        config.location.source = LocationSource::Fixed;
        config.location.fixed_latitude = lat;
        config.location.fixed_longitude = lon;
    }

    if args.no_audio {
        config.playback.enabled = false;
    }
    Ok(config)
}

fn open_output(config: &AppConfig) -> Arc<dyn AudioOutput> {
    if !config.playback.enabled {
        log::info!("Audio output disabled; clips are cached but not played");
        return Arc::new(SilentOutput);
    }
    match RodioOutput::open_default() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            log::warn!("Audio output unavailable ({e}); continuing silently");
            Arc::new(SilentOutput)
        }
    }
}

fn build_orchestrator(config: &AppConfig, credentials: &Credentials) -> PipelineOrchestrator {
    let stages = Stages {
        position: Arc::new(GatedPosition::from_config(&config.location)),
        resolver: Arc::new(GeoNamesResolver::from_config(
            &config.geocoder,
            credentials.geonames_username.clone().unwrap_or_default(),
        )),
        narrator: Arc::new(ChatNarrator::from_config(
            &config.narrative,
            credentials.openai_api_key.clone(),
        )),
        speech: Arc::new(OpenAiSpeech::from_config(
            &config.speech,
            credentials.openai_api_key.clone(),
        )),
        cache: Arc::new(AudioCache::from_config(&config.storage)),
    };

    let print_status = |status: &PipelineStatus| {
        println!("[{}] {}", status.state, status.message);
    };

    PipelineOrchestrator::new(stages, Player::new(open_output(config)))
        .with_observer(Arc::new(LogObserver))
        .with_observer(Arc::new(print_status))
        .with_poll_interval(Duration::from_millis(config.playback.poll_interval_ms))
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed => log::info!("Run complete"),
        RunOutcome::Rejected(state) => log::warn!("Busy ({state}); trigger ignored"),
        RunOutcome::Failed { stage, error } => {
            log::error!("Run failed while {stage}: {error}")
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger loop
// ---------------------------------------------------------------------------

async fn interactive(orchestrator: Arc<PipelineOrchestrator>) -> Result<()> {
    println!("Press Enter to hear about where you are, `q` to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("cannot read stdin")? else {
                    break;
                };
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                let orc = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    let outcome = orc.run().await;
                    report(&outcome);
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("place-narrator starting up");

    // 2–3. Command line and configuration
    let args = Args::parse();
    let config = load_config(&args)?;

    // 4. Credentials
    let credentials = Credentials::from_env();
    for var in credentials.missing() {
        log::warn!("{var} is not set; the stage that needs it will fail");
    }

    // Runtime (2 workers: network stages + blocking file/device work)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        // 5–6. Output device and orchestrator
        let orchestrator = Arc::new(build_orchestrator(&config, &credentials));

        // 7. Triggers
        let result = if args.once {
            tokio::select! {
                outcome = orchestrator.run() => {
                    report(&outcome);
                    match outcome {
                        RunOutcome::Failed { error, .. } => Err(anyhow::Error::from(error)),
                        _ => Ok(()),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Ctrl-C received");
                    Ok(())
                }
            }
        } else {
            interactive(Arc::clone(&orchestrator)).await
        };

        orchestrator.shutdown();
        result
    })
}
