//! obs-stream-sync - align OBS feeds onto the same moment in time.
//!
//! Connects to OBS over obs-websocket v5, captures a frame of every feed,
//! decodes the QR timestamp burned into each picture, and sets the audio
//! and video delays that bring the feeds back in sync.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;

use oss_core::config::ConfigManager;
use oss_core::logging;
use oss_core::obs::ObsClient;

#[derive(Parser, Debug)]
#[command(
    name = "obs-stream-sync",
    version,
    about = "Synchronize OBS feed delays using QR-encoded timestamps"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture timestamps, show the per-feed report, and sync after confirmation
    Sync {
        /// Apply immediately, without the report or confirmation
        #[arg(long)]
        now: bool,

        /// Pin the zero-point to this source instead of auto-selecting
        #[arg(long)]
        to: Option<String>,

        /// Restrict the run to these sources (repeatable; the --to target
        /// is always included)
        #[arg(long = "only")]
        only: Vec<String>,
    },

    /// Reset every active feed's audio and video delay to zero
    Reset,

    /// Show the delays currently applied in OBS
    Delays,

    /// Interactively set a delay on each active feed
    SetDelays,

    /// Media-source housekeeping for every feed
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },

    /// Crop scene items in the current scene to a target aspect ratio
    Crop {
        /// Target ratio, e.g. 16:9 or 16:10
        ratio: String,
    },

    /// Create or update the configuration interactively
    Setup,
}

#[derive(Subcommand, Debug)]
enum MediaAction {
    /// Resume playback on every feed
    Play,
    /// Pause playback on every feed
    Pause,
    /// Toggle "restart playback when source becomes active" (media sources only)
    RestartOnActivate {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Toggle "use hardware decoding when available" (media sources only)
    HwDecode {
        #[arg(value_enum)]
        state: Switch,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn enabled(self) -> bool {
        matches!(self, Switch::On)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    logging::init_tracing(config.settings().logging.debug);

    // Setup works without a running OBS instance.
    if matches!(cli.command, Command::Setup) {
        return commands::setup::run(&mut config);
    }

    let settings = config.settings().clone();
    let password = if settings.obs.server_password.is_empty() {
        None
    } else {
        Some(settings.obs.server_password.as_str())
    };
    let client = ObsClient::connect(&settings.obs.server_url, password)
        .await
        .with_context(|| {
            format!(
                "failed to connect to OBS at {} (check {} or run `obs-stream-sync setup`)",
                settings.obs.server_url,
                cli.config.display()
            )
        })?;

    let version = client.get_version().await?;
    println!(
        "Connected to obs-websocket {} (using RPC {})",
        client.websocket_version(),
        client.rpc_version()
    );
    println!("OBS Studio {} detected.", style(&version.obs_version).bold());

    match cli.command {
        Command::Sync { now, to, only } => {
            commands::sync::run(&client, &settings, to.as_deref(), &only, now).await
        }
        Command::Reset => commands::sync::reset(&client, &settings).await,
        Command::Delays => commands::delays::show(&client, &settings).await,
        Command::SetDelays => commands::delays::set_interactive(&client, &settings).await,
        Command::Media { action } => match action {
            MediaAction::Play => commands::media::playback(&client, &settings, true).await,
            MediaAction::Pause => commands::media::playback(&client, &settings, false).await,
            MediaAction::RestartOnActivate { state } => {
                commands::media::set_media_setting(
                    &client,
                    &settings,
                    "restart_on_activate",
                    state.enabled(),
                )
                .await
            }
            MediaAction::HwDecode { state } => {
                commands::media::set_media_setting(&client, &settings, "hw_decode", state.enabled())
                    .await
            }
        },
        Command::Crop { ratio } => commands::crop::run(&client, &ratio).await,
        Command::Setup => unreachable!("handled before connecting"),
    }
}
