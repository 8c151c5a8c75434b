//! Where ASCII frames end up.

use std::io::{self, BufWriter, Stdout, Write};
use std::sync::{Arc, Mutex};

use crate::convert::AsciiFrame;

/// Clear-then-write surface driven by the playback loop.
pub trait DisplaySurface: Send {
    fn clear(&mut self) -> io::Result<()>;

    fn write(&mut self, frame: &AsciiFrame) -> io::Result<()>;
}

const CLEAR_SCREEN: &[u8] = b"\x1B[2J\x1B[H";

/// ANSI terminal on any writer, buffered stdout by default.
///
/// Nothing reaches the writer until [`DisplaySurface::write`] flushes, so the
/// clear and the whole frame go out together.
pub struct TerminalDisplay<W: Write = BufWriter<Stdout>> {
    out: W,
}

impl TerminalDisplay<BufWriter<Stdout>> {
    /// Create a display on the process's stdout.
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(io::stdout()))
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Create a display on `out`. Wrap unbuffered writers in a [`BufWriter`].
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> DisplaySurface for TerminalDisplay<W> {
    fn clear(&mut self) -> io::Result<()> {
        self.out.write_all(CLEAR_SCREEN)
    }

    fn write(&mut self, frame: &AsciiFrame) -> io::Result<()> {
        self.out.write_all(frame.as_str().as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Snapshot of what a [`RecordingDisplay`] has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    pub clears: usize,
    pub frames: Vec<String>,
}

/// Display double that records writes instead of touching a terminal.
///
/// Clones share one recording, so a test can keep a handle while the
/// playback loop owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Recording {
        self.recording
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn frames(&self) -> Vec<String> {
        self.snapshot().frames
    }
}

impl DisplaySurface for RecordingDisplay {
    fn clear(&mut self) -> io::Result<()> {
        self.recording.lock().unwrap_or_else(|e| e.into_inner()).clears += 1;
        Ok(())
    }

    fn write(&mut self, frame: &AsciiFrame) -> io::Result<()> {
        self.recording
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .frames
            .push(frame.as_str().to_string());
        Ok(())
    }
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }

    fn write(&mut self, frame: &AsciiFrame) -> io::Result<()> {
        (**self).write(frame)
    }
}
