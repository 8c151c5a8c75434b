//! Defaults file and validated run options.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::convert::FrameSize;
use crate::error::{PlayerError, Result};
use crate::source::FfmpegConfig;

pub const DEFAULT_WIDTH: u32 = 100;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
/// Terminal cells are roughly twice as tall as they are wide.
pub const DEFAULT_CHAR_ASPECT: f32 = 0.55;

const CONFIG_FILE_NAME: &str = "asciiplay.json";

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_char_aspect() -> f32 {
    DEFAULT_CHAR_ASPECT
}

/// Player defaults read from `asciiplay.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    /// Fixed output height. Derived from the video's aspect ratio when absent.
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_char_aspect")]
    pub char_aspect: f32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(flatten)]
    pub ffmpeg: FfmpegConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: None,
            fps: DEFAULT_FPS,
            char_aspect: DEFAULT_CHAR_ASPECT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PlayerError::Configuration(format!("reading config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PlayerError::Configuration(format!("parsing config {}: {}", path.display(), e))
        })
    }

    /// Search the per-user data directory, then the working directory, then fall
    /// back to built-in defaults.
    pub fn load() -> Result<Self> {
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                debug!("loading config from {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut tried = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push("asciiplay");
            d.push(CONFIG_FILE_NAME);
            tried.push(d);
        }
        tried.push(PathBuf::from(CONFIG_FILE_NAME));
        tried
    }

    /// Run options for `video_path` seeded from these defaults.
    pub fn options_for(&self, video_path: impl Into<PathBuf>) -> PlayerOptions {
        PlayerOptions {
            video_path: video_path.into(),
            width: self.width,
            height: match self.height {
                Some(h) => HeightMode::Explicit(h),
                None => HeightMode::Derived {
                    char_aspect: self.char_aspect,
                },
            },
            fps: self.fps,
            queue_capacity: self.queue_capacity,
            ffmpeg: self.ffmpeg.clone(),
        }
    }
}

/// How the output height is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeightMode {
    Explicit(u32),
    /// `width * (source_height / source_width) * char_aspect`, floored, at least 1.
    Derived { char_aspect: f32 },
}

impl Default for HeightMode {
    fn default() -> Self {
        HeightMode::Derived {
            char_aspect: DEFAULT_CHAR_ASPECT,
        }
    }
}

impl HeightMode {
    /// Output grid for a source of `source_width` x `source_height` pixels.
    pub fn resolve(&self, width: u32, source_width: u32, source_height: u32) -> FrameSize {
        let height = match *self {
            HeightMode::Explicit(h) => h,
            HeightMode::Derived { char_aspect } => {
                let aspect = f64::from(source_height) / f64::from(source_width.max(1));
                (f64::from(width) * aspect * f64::from(char_aspect)).floor() as u32
            }
        };
        FrameSize::new(width, height.max(1))
    }
}

/// Everything one playback session needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    pub video_path: PathBuf,
    pub width: u32,
    pub height: HeightMode,
    pub fps: u32,
    pub queue_capacity: usize,
    pub ffmpeg: FfmpegConfig,
}

impl PlayerOptions {
    pub fn new(video_path: impl Into<PathBuf>) -> Self {
        AppConfig::default().options_for(video_path)
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: HeightMode) -> Self {
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Reject anything that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        if !self.video_path.exists() {
            return Err(PlayerError::Configuration(format!(
                "file {} does not exist",
                self.video_path.display()
            )));
        }
        if !self.video_path.is_file() {
            return Err(PlayerError::Configuration(format!(
                "{} is not a file",
                self.video_path.display()
            )));
        }
        self.validate_numbers()
    }

    pub(crate) fn validate_numbers(&self) -> Result<()> {
        if self.width == 0 {
            return Err(PlayerError::Configuration("width must be at least 1".into()));
        }
        match self.height {
            HeightMode::Explicit(0) => {
                return Err(PlayerError::Configuration("height must be at least 1".into()));
            }
            HeightMode::Derived { char_aspect } if !(char_aspect.is_finite() && char_aspect > 0.0) => {
                return Err(PlayerError::Configuration(format!(
                    "character aspect must be positive, got {}",
                    char_aspect
                )));
            }
            _ => {}
        }
        if self.fps == 0 {
            return Err(PlayerError::Configuration("fps must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PlayerError::Configuration("queue capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn existing_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not really a video").unwrap();
        f
    }

    #[test]
    fn test_defaults() {
        let opts = PlayerOptions::new("clip.mp4");
        assert_eq!(opts.width, 100);
        assert_eq!(opts.fps, 30);
        assert_eq!(opts.queue_capacity, 10);
        assert_eq!(opts.height, HeightMode::Derived { char_aspect: 0.55 });
    }

    #[test]
    fn test_derived_height_uses_char_aspect() {
        // 1920x1080 at 100 columns: 100 * 0.5625 * 0.55 = 30.9375
        let size = HeightMode::default().resolve(100, 1920, 1080);
        assert_eq!(size, FrameSize::new(100, 30));
    }

    #[test]
    fn test_derived_height_never_zero() {
        let size = HeightMode::default().resolve(1, 4000, 10);
        assert_eq!(size.height, 1);
    }

    #[test]
    fn test_explicit_height_ignores_source() {
        let size = HeightMode::Explicit(40).resolve(120, 640, 480);
        assert_eq!(size, FrameSize::new(120, 40));
    }

    #[test]
    fn test_validate_missing_file() {
        let err = PlayerOptions::new("/definitely/not/here.mp4").validate().unwrap_err();
        assert!(matches!(err, PlayerError::Configuration(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let file = existing_file();
        let base = PlayerOptions::new(file.path());
        assert!(base.validate().is_ok());

        let cases = [
            base.clone().with_width(0),
            base.clone().with_fps(0),
            base.clone().with_queue_capacity(0),
            base.clone().with_height(HeightMode::Explicit(0)),
            base.clone().with_height(HeightMode::Derived { char_aspect: 0.0 }),
            base.clone().with_height(HeightMode::Derived { char_aspect: f32::NAN }),
        ];
        for opts in cases {
            let err = opts.validate().unwrap_err();
            assert!(matches!(err, PlayerError::Configuration(_)), "{:?}", opts);
        }
    }

    #[test]
    fn test_validate_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlayerOptions::new(dir.path()).validate().unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn test_partial_config_file_gets_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(br#"{"fps": 12, "ffprobe_path": "/opt/ffmpeg/bin/ffprobe"}"#).unwrap();
        let cfg = AppConfig::from_file(f.path()).unwrap();
        assert_eq!(cfg.fps, 12);
        assert_eq!(cfg.width, DEFAULT_WIDTH);
        assert_eq!(cfg.height, None);
        assert_eq!(cfg.ffmpeg.ffprobe_path, "/opt/ffmpeg/bin/ffprobe");
        assert_eq!(cfg.ffmpeg.ffmpeg_path, "ffmpeg");
    }

    #[test]
    fn test_config_height_selects_explicit_mode() {
        let cfg: AppConfig = serde_json::from_str(r#"{"width": 80, "height": 24}"#).unwrap();
        let opts = cfg.options_for("x.mp4");
        assert_eq!(opts.width, 80);
        assert_eq!(opts.height, HeightMode::Explicit(24));
    }

    #[test]
    fn test_malformed_config_is_configuration_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"{ not json").unwrap();
        let err = AppConfig::from_file(f.path()).unwrap_err();
        assert!(matches!(err, PlayerError::Configuration(_)));
    }
}
