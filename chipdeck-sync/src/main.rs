//! chipdeck-sync - reconciliation loop demo
//!
//! Runs playback sessions against the simulated engine and prints the events
//! the state publisher broadcasts. Without `--playlist` a small demo playlist
//! is used: a local multi-subtune file, a remote stream without tags and a
//! cached download.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chipdeck_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use chipdeck_common::human_time::format_progress;
use chipdeck_common::time::millis_to_duration;
use chipdeck_common::{ChipdeckEvent, RepeatMode};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chipdeck_sync::history::{self, PlayHistory};
use chipdeck_sync::{
    PlaybackSink, SessionDeps, SessionInputs, SessionSupervisor, SharedState, SimTrack,
    SimulatedEngine, StatePublisher, TokioClock, TomlConfig,
};

/// Command-line arguments for chipdeck-sync
#[derive(Parser, Debug)]
#[command(name = "chipdeck-sync")]
#[command(about = "Playback state reconciliation demo for chipdeck")]
#[command(version)]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CHIPDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Files to play instead of the demo playlist
    #[arg(short, long, num_args = 1..)]
    playlist: Vec<String>,

    /// Repeat mode (none, playlist, track); overrides the config file
    #[arg(short, long)]
    repeat: Option<RepeatMode>,

    /// Length of every simulated track in seconds
    #[arg(long, default_value = "6.0")]
    track_secs: f64,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Stop after this many seconds even if playback continues
    #[arg(long, env = "CHIPDECK_MAX_SECS")]
    max_secs: Option<u64>,
}

fn demo_playlist(track_secs: f64) -> Vec<SimTrack> {
    vec![
        SimTrack::new("/music/hvsc/Hubbard_Rob/Commando.sid", track_secs)
            .with_title("Commando")
            .with_artist("Rob Hubbard")
            .with_subtunes(3),
        SimTrack::new(
            "https://modarchive.example/downloads/space_debris.mod?dl=1",
            track_secs,
        )
        .with_artist("Captain"),
        SimTrack::new(
            "/home/chip/.local/share/chipdeck/cache/4f2a/Axel_F.xm",
            track_secs,
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = TomlConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "chipdeck_sync={level},chipdeck_common={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let mut sync = config.sync.clone();
    if let Some(mode) = args.repeat {
        sync.repeat_mode = mode;
    }
    info!("Repeat mode: {}", sync.repeat_mode);

    let playlist = if args.playlist.is_empty() {
        demo_playlist(args.track_secs)
    } else {
        args.playlist
            .iter()
            .map(|path| SimTrack::new(path.clone(), args.track_secs))
            .collect()
    };
    info!("Playlist has {} tracks", playlist.len());

    let state = Arc::new(SharedState::new(sync.event_capacity));
    let (history_tx, history_rx) = history::channel();
    let (play_history, history_handle) = PlayHistory::spawn(history_rx);
    let sink: Arc<dyn PlaybackSink> =
        Arc::new(StatePublisher::new(state.clone()).with_history(history_tx));

    let inputs = Arc::new(SessionInputs::new(sync.repeat_mode));
    let clock = TokioClock::shared();
    let engine = Arc::new(
        SimulatedEngine::new(playlist, inputs.clone(), clock.clone()).with_metadata_delay(700),
    );

    let printer = tokio::spawn(print_events(state.clone(), args.json));

    let supervisor = SessionSupervisor::spawn(SessionDeps {
        engine: engine.clone(),
        sink: sink.clone(),
        inputs: inputs.clone(),
        clock,
        config: sync,
    });

    if !engine.load(0) {
        warn!("Playlist is empty, nothing to play");
    }

    let script = tokio::spawn(scripted_interactions(engine.clone(), args.track_secs));

    let deadline = async {
        match args.max_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = wait_for_unload(&inputs) => info!("Playback finished"),
        _ = shutdown_signal() => {},
        _ = deadline => info!("Time limit reached"),
    }

    script.abort();
    supervisor
        .shutdown()
        .await
        .context("Failed to stop session supervisor")?;
    drop(sink);

    if tokio::time::timeout(Duration::from_secs(1), history_handle)
        .await
        .is_err()
    {
        warn!("History store did not drain in time");
    }
    printer.abort();

    let entries = play_history.entries();
    info!("Played {} entries", entries.len());
    for entry in entries {
        info!(
            "  {} {} - {}",
            entry.played_at.format("%H:%M:%S"),
            entry.record.artist.as_deref().unwrap_or("?"),
            entry.record.title.as_deref().unwrap_or(&entry.record.source_id)
        );
    }

    Ok(())
}

/// Seek into the first track and switch subtunes, the way a user would
async fn scripted_interactions(engine: Arc<SimulatedEngine>, track_secs: f64) {
    tokio::time::sleep(millis_to_duration(1500)).await;
    info!("Demo: seeking to the middle of the track");
    engine.seek(track_secs / 2.0);

    tokio::time::sleep(millis_to_duration(1000)).await;
    info!("Demo: switching to subtune 2");
    engine.select_subtune(1);
}

async fn wait_for_unload(inputs: &SessionInputs) {
    let mut selection = inputs.subscribe_selection();
    loop {
        if selection.borrow_and_update().is_none() {
            return;
        }
        if selection.changed().await.is_err() {
            return;
        }
    }
}

async fn print_events(state: Arc<SharedState>, json: bool) {
    let mut rx = state.subscribe_events();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
            continue;
        }

        let line = match &event {
            ChipdeckEvent::PlaybackProgress {
                position_ms,
                duration_ms,
                state,
                ..
            } => format!(
                "{} [{}]",
                format_progress(*position_ms as f64 / 1000.0, *duration_ms as f64 / 1000.0),
                state
            ),
            ChipdeckEvent::SessionStarted { file, .. } => format!("session started: {}", file),
            ChipdeckEvent::SessionEnded { file, cycles, .. } => {
                format!("session ended: {} ({} cycles)", file, cycles)
            }
            ChipdeckEvent::SeekStateChanged {
                in_progress,
                ui_busy,
                ..
            } => format!("seek in_progress={} busy={}", in_progress, ui_busy),
            ChipdeckEvent::SubtuneChanged { cursor, .. } => format!("subtune {}", cursor),
            ChipdeckEvent::MetadataChanged { title, artist, .. } => match (title, artist) {
                (Some(title), _) => format!("title: {:?}", title),
                (None, Some(artist)) => format!("artist: {:?}", artist),
                (None, None) => continue,
            },
            ChipdeckEvent::TrackPlayed {
                source_id, title, ..
            } => format!(
                "played: {}",
                title.as_deref().unwrap_or(source_id.as_str())
            ),
            ChipdeckEvent::WatchedSourceChanged { source_id, .. } => {
                format!("watching {}", source_id)
            }
            ChipdeckEvent::TrackAdvanced {
                from_source_id,
                repeat_mode,
                ..
            } => format!("advanced from {} (repeat {})", from_source_id, repeat_mode),
            ChipdeckEvent::PlaybackUnloaded { source_id, .. } => {
                format!("unloaded after {}", source_id)
            }
        };
        println!("{:<22} {}", event.event_type(), line);
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
