//! Decode loop: source frames in, ASCII frames onto the queue.

use log::{debug, warn};

use crate::cancel::CancelToken;
use crate::convert::{convert, AsciiFrame, FrameSize};
use crate::queue::FrameSender;
use crate::source::VideoSource;

/// What the decode loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Frames handed to the queue, blanks included.
    pub frames_sent: u64,
    /// Frames replaced with a blank after a conversion failure.
    pub blank_frames: u64,
    /// Whether the loop ended on a decoder read failure rather than a clean end of stream.
    pub decode_failed: bool,
}

/// Pull every frame out of `source`, convert it and enqueue it.
///
/// A frame that fails conversion is replaced with a blank frame of `size`, so
/// playback never loses its place. The loop stops at end of stream, on a broken
/// decoder, on cancellation, or when the playback side goes away. Unless the
/// playback side is already gone, the end-of-stream marker is sent exactly once,
/// and the source is always released afterwards.
pub fn run<S>(mut source: S, sender: FrameSender, size: FrameSize, cancel: &CancelToken) -> ProducerStats
where
    S: VideoSource,
{
    let mut stats = ProducerStats::default();
    let mut consumer_gone = false;

    while !cancel.is_cancelled() {
        let decoded = match source.read_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!("stopping decode after {} frames: {}", stats.frames_sent, e);
                stats.decode_failed = true;
                break;
            }
        };

        let ascii = match convert(&decoded, size) {
            Ok(ascii) => ascii,
            Err(e) if e.is_frame_recoverable() => {
                warn!("frame {} substituted with blank: {}", stats.frames_sent + 1, e);
                stats.blank_frames += 1;
                AsciiFrame::blank(size)
            }
            Err(e) => {
                warn!("stopping decode after {} frames: {}", stats.frames_sent, e);
                stats.decode_failed = true;
                break;
            }
        };

        if sender.send(ascii).is_err() {
            consumer_gone = true;
            break;
        }
        stats.frames_sent += 1;
    }

    if !consumer_gone {
        if let Err(e) = sender.finish() {
            debug!("end of stream not delivered: {}", e);
        }
    } else {
        debug!("playback loop gone, skipping end of stream marker");
    }
    source.release();

    debug!(
        "decode loop finished: {} frames, {} blank",
        stats.frames_sent, stats.blank_frames
    );
    stats
}
