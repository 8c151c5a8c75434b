use anyhow::{Context, Result};
use asciiplay::{AppConfig, CancelToken, HeightMode, Player, TerminalDisplay};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Play a video file as ASCII art in the terminal.")]
struct Args {
    /// Video file to play
    video: PathBuf,

    /// Output width in characters
    #[arg(long, short)]
    width: Option<u32>,

    /// Output height in rows (derived from the video's aspect ratio when omitted)
    #[arg(long)]
    height: Option<u32>,

    /// Playback frames per second
    #[arg(long, short)]
    fps: Option<u32>,

    /// Character cell width:height correction used for derived heights
    #[arg(long, conflicts_with = "height")]
    char_aspect: Option<f32>,

    /// Decoded frames buffered ahead of the display
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Read defaults from this JSON file instead of the usual locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print playback statistics as JSON when done
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_file(path).with_context(|| format!("loading config {}", path.display())),
        None => AppConfig::load().context("loading config"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = load_config(args.config.as_ref())?;
    let mut options = cfg.options_for(&args.video);
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = HeightMode::Explicit(height);
    } else if let Some(char_aspect) = args.char_aspect {
        options.height = HeightMode::Derived { char_aspect };
    }
    if let Some(fps) = args.fps {
        options.fps = fps;
    }
    if let Some(capacity) = args.queue_capacity {
        options.queue_capacity = capacity;
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Ctrl+C handler not installed: {}", e);
    }

    let player = Player::new(options);
    let report = player
        .play(TerminalDisplay::stdout(), &cancel)
        .with_context(|| format!("playing {}", args.video.display()))?;

    if report.cancelled {
        info!("playback interrupted after {} frames", report.frames_shown);
    }
    if report.decoder_failed {
        warn!("decoder stopped early; playback ended after {} frames", report.frames_shown);
    }
    if report.blank_frames > 0 {
        warn!("{} frames could not be converted and were shown blank", report.blank_frames);
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&report).context("serialising playback report")?);
        println!("Effective FPS: {:.1}", report.effective_fps());
    }

    Ok(())
}
