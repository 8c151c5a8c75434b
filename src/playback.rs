//! Playback loop: paced dequeue and display.

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::cancel::CancelToken;
use crate::display::DisplaySurface;
use crate::error::{PlayerError, Result};
use crate::queue::{FrameReceiver, Received};

/// Longest stretch the loop blocks on an empty queue before re-checking cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What the playback loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub frames_shown: u64,
    /// Frames whose dequeue and write took longer than the frame budget.
    pub overruns: u64,
    pub elapsed: Duration,
    /// Whether playback stopped on cancellation instead of end of stream.
    pub cancelled: bool,
}

/// Time budget for one frame at `fps`.
pub fn frame_delay(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Show frames from `receiver` on `display` at `fps` until end of stream or cancellation.
///
/// Each iteration is timed from just before the dequeue. Whatever is left of the
/// frame budget after writing is slept off. An overrun proceeds straight to the
/// next frame with no catch-up, so drift is bounded per frame rather than corrected.
///
/// # Errors
///
/// [`PlayerError::Display`] if the display cannot be written, and
/// [`PlayerError::QueueProtocol`] if the decode loop hangs up without an end-of-stream marker.
pub fn run<D>(mut receiver: FrameReceiver, fps: u32, display: &mut D, cancel: &CancelToken) -> Result<PlaybackStats>
where
    D: DisplaySurface + ?Sized,
{
    let delay = frame_delay(fps);
    let started = Instant::now();
    let mut stats = PlaybackStats::default();

    'frames: loop {
        let frame_start = Instant::now();

        let frame = loop {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break 'frames;
            }
            match receiver.recv_timeout(POLL_INTERVAL)? {
                Received::Frame(frame) => break frame,
                Received::EndOfStream => break 'frames,
                Received::Timeout => trace!("queue empty, waiting"),
            }
        };

        display.clear().map_err(PlayerError::Display)?;
        display.write(&frame).map_err(PlayerError::Display)?;
        stats.frames_shown += 1;

        let elapsed = frame_start.elapsed();
        match delay.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => {
                if cancel.wait_timeout(remaining) {
                    stats.cancelled = true;
                    break;
                }
            }
            _ => {
                stats.overruns += 1;
                trace!("frame {} overran budget by {:?}", stats.frames_shown, elapsed - delay);
            }
        }
    }

    stats.elapsed = started.elapsed();
    debug!(
        "playback finished: {} frames in {:?}, {} overruns{}",
        stats.frames_shown,
        stats.elapsed,
        stats.overruns,
        if stats.cancelled { " (cancelled)" } else { "" }
    );
    Ok(stats)
}
