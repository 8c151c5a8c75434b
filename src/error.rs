use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while configuring or running a playback session.
///
/// Only [`PlayerError::Configuration`], [`PlayerError::SourceOpen`],
/// [`PlayerError::Display`] and [`PlayerError::WorkerPanicked`] ever halt a run.
/// Frame-level failures are absorbed by the decode loop.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Invalid path or numeric parameter, caught before the pipeline starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The decoder could not open the video.
    #[error("cannot open video {}: {reason}", .path.display())]
    SourceOpen { path: PathBuf, reason: String },

    /// A decoded frame had no pixels.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Grayscale or resampling failed for a single frame.
    #[error("frame conversion failed: {0}")]
    Conversion(String),

    /// The decoder pipe broke mid-stream.
    #[error("decoder read failed: {0}")]
    Decode(#[source] std::io::Error),

    /// The frame queue saw something other than frames followed by one sentinel.
    #[error("frame queue protocol violation: {0}")]
    QueueProtocol(String),

    /// The playback side dropped its end of the queue.
    #[error("playback loop is no longer receiving frames")]
    ConsumerGone,

    /// Writing to the display surface failed.
    #[error("display write failed: {0}")]
    Display(#[source] std::io::Error),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

impl PlayerError {
    /// Whether the decode loop may recover from this error by substituting a blank frame.
    pub fn is_frame_recoverable(&self) -> bool {
        matches!(self, PlayerError::InvalidFrame(_) | PlayerError::Conversion(_))
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
