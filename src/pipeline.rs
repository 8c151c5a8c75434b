//! One playback session: decode loop and playback loop on two threads joined
//! by a bounded frame queue.

use std::thread;
use std::time::Duration;

use log::info;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::config::PlayerOptions;
use crate::convert::FrameSize;
use crate::display::DisplaySurface;
use crate::error::{PlayerError, Result};
use crate::playback::{self, PlaybackStats};
use crate::producer::{self, ProducerStats};
use crate::queue::frame_queue;
use crate::source::{FfmpegSource, VideoSource};

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub size: FrameSize,
    pub frames_decoded: u64,
    pub blank_frames: u64,
    /// Decoding stopped on a broken decoder rather than a clean end of stream.
    pub decoder_failed: bool,
    pub frames_shown: u64,
    pub overruns: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl PlaybackReport {
    fn new(size: FrameSize, produced: ProducerStats, played: PlaybackStats) -> Self {
        Self {
            size,
            frames_decoded: produced.frames_sent,
            blank_frames: produced.blank_frames,
            decoder_failed: produced.decode_failed,
            frames_shown: played.frames_shown,
            overruns: played.overruns,
            elapsed: played.elapsed,
            cancelled: played.cancelled,
        }
    }

    /// Frames shown per second of wall time.
    pub fn effective_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_shown as f64 / secs
        } else {
            0.0
        }
    }
}

/// Plays one video according to a set of [`PlayerOptions`].
#[derive(Debug, Clone)]
pub struct Player {
    options: PlayerOptions,
}

impl Player {
    pub fn new(options: PlayerOptions) -> Self {
        Self { options }
    }

    /// Validate options, open the video with ffmpeg and play it to `display`.
    ///
    /// # Errors
    ///
    /// Configuration and source-open failures are returned before any thread
    /// starts. Display failures and worker panics end the session.
    pub fn play<D>(&self, display: D, cancel: &CancelToken) -> Result<PlaybackReport>
    where
        D: DisplaySurface,
    {
        self.options.validate()?;
        let source = FfmpegSource::open(&self.options.video_path, &self.options.ffmpeg)?;
        let (src_w, src_h) = source.dimensions();
        let size = self.options.height.resolve(self.options.width, src_w, src_h);
        info!(
            "playing {} ({}x{}) as {} characters at {} fps",
            self.options.video_path.display(),
            src_w,
            src_h,
            size,
            self.options.fps
        );
        self.play_source(source, size, display, cancel)
    }

    /// Play frames from an already open `source` at `size`.
    ///
    /// The path in the options is not consulted; the numeric options still are.
    pub fn play_source<S, D>(&self, source: S, size: FrameSize, mut display: D, cancel: &CancelToken) -> Result<PlaybackReport>
    where
        S: VideoSource,
        D: DisplaySurface,
    {
        self.options.validate_numbers()?;
        if size.is_empty() {
            return Err(PlayerError::Configuration(format!("output size {} is empty", size)));
        }

        let (sender, receiver) = frame_queue(self.options.queue_capacity);
        let fps = self.options.fps;

        let (produced, played) = thread::scope(|scope| {
            let decode = scope.spawn(move || producer::run(source, sender, size, cancel));
            let played = playback::run(receiver, fps, &mut display, cancel);
            (decode.join(), played)
        });

        // A panicking decode loop also surfaces as a queue protocol error; report the panic.
        let produced = produced.map_err(|_| PlayerError::WorkerPanicked("decode"))?;
        let played = played?;

        let report = PlaybackReport::new(size, produced, played);
        info!(
            "shown {} of {} frames ({} blank) in {:.2?}",
            report.frames_shown, report.frames_decoded, report.blank_frames, report.elapsed
        );
        Ok(report)
    }
}
