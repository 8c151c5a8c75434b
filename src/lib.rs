//! # asciiplay - Terminal ASCII Video Player
//!
//! `asciiplay` decodes a video file and plays it back as ASCII art in the terminal.
//!
//! ## Features
//!
//! - Decode any video ffmpeg understands, streamed frame by frame
//! - Area-averaged downsampling onto a fixed-width character grid
//! - Explicit output height, or one derived from the video's aspect ratio
//! - Decoding and display run on separate threads, joined by a bounded queue
//! - Frames that fail conversion are shown blank instead of stopping playback
//! - Cooperative cancellation (Ctrl+C in the binary)
//!
//! ## Example
//!
//! ```no_run
//! use asciiplay::{CancelToken, HeightMode, Player, PlayerOptions, TerminalDisplay};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = PlayerOptions::new("video.mp4")
//!     .with_width(120)
//!     .with_height(HeightMode::Explicit(40))
//!     .with_fps(24);
//!
//! let report = Player::new(options).play(TerminalDisplay::stdout(), &CancelToken::new())?;
//! println!("{} frames shown", report.frames_shown);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom sources and displays
//!
//! Anything implementing [`VideoSource`] can feed the player, and anything
//! implementing [`DisplaySurface`] can show it:
//!
//! ```
//! use asciiplay::{
//!     CancelToken, DecodedFrame, FrameSize, Player, PlayerOptions, RecordingDisplay, Result,
//!     VideoSource,
//! };
//!
//! struct Gradient(u8);
//!
//! impl VideoSource for Gradient {
//!     fn dimensions(&self) -> (u32, u32) {
//!         (16, 8)
//!     }
//!
//!     fn read_next(&mut self) -> Result<Option<DecodedFrame>> {
//!         if self.0 == 0 {
//!             return Ok(None);
//!         }
//!         self.0 -= 1;
//!         let img = image::RgbImage::from_pixel(16, 8, image::Rgb([0, 0, 0]));
//!         Ok(Some(DecodedFrame::from_rgb(img)))
//!     }
//!
//!     fn release(&mut self) {}
//! }
//!
//! let display = RecordingDisplay::new();
//! let player = Player::new(PlayerOptions::new("unused").with_fps(1000));
//! let report = player
//!     .play_source(Gradient(3), FrameSize::new(4, 2), display.clone(), &CancelToken::new())
//!     .unwrap();
//! assert_eq!(report.frames_shown, 3);
//! assert_eq!(display.frames()[0], "@@@@\n@@@@");
//! ```

pub mod cancel;
pub mod config;
pub mod convert;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod producer;
pub mod queue;
pub mod source;

pub use cancel::CancelToken;
pub use config::{AppConfig, HeightMode, PlayerOptions};
pub use convert::{char_for, convert, AsciiFrame, DecodedFrame, FrameSize, ASCII_RAMP};
pub use display::{DisplaySurface, Recording, RecordingDisplay, TerminalDisplay};
pub use error::{PlayerError, Result};
pub use pipeline::{PlaybackReport, Player};
pub use playback::PlaybackStats;
pub use producer::ProducerStats;
pub use queue::{frame_queue, FrameReceiver, FrameSender, QueueItem, Received, TrySend};
pub use source::{FfmpegConfig, FfmpegSource, VideoSource};
