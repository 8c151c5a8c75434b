//! Video decoding capability.
//!
//! [`VideoSource`] is the seam between the decode loop and whatever produces
//! pixels. [`FfmpegSource`] streams raw `rgb24` frames out of an `ffmpeg` child
//! process, sized with a one-off `ffprobe` call.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command as ProcCommand, Stdio};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::convert::DecodedFrame;
use crate::error::{PlayerError, Result};

/// A sequential frame decoder.
pub trait VideoSource: Send {
    /// Native frame dimensions, `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// The next frame, or `Ok(None)` at end of stream.
    fn read_next(&mut self) -> Result<Option<DecodedFrame>>;

    /// Release decoder resources. Calling it twice is harmless.
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn read_next(&mut self) -> Result<Option<DecodedFrame>> {
        (**self).read_next()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Which ffmpeg executables to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
        }
    }
}

/// Frames decoded by an `ffmpeg` child process writing `rgb24` to its stdout.
pub struct FfmpegSource {
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_thread: Option<JoinHandle<()>>,
    frames_read: u64,
}

impl FfmpegSource {
    /// Probe `path` for its dimensions and start decoding.
    ///
    /// # Errors
    ///
    /// [`PlayerError::SourceOpen`] when either executable is missing, the file has
    /// no decodable video stream, or the decoder fails to start.
    pub fn open(path: &Path, config: &FfmpegConfig) -> Result<Self> {
        let (width, height) = probe_dimensions(path, config)?;
        debug!("{} is {}x{}", path.display(), width, height);

        let mut child = decoder_command(path, config, width, height)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| open_error(path, spawn_reason(&config.ffmpeg_path, e)))?;

        let stdout = child.stdout.take();
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines() {
                    match line {
                        Ok(l) if !l.trim().is_empty() => warn!("[ffmpeg] {}", l),
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
            })
        });

        Ok(Self {
            width,
            height,
            child: Some(child),
            stdout,
            stderr_thread,
            frames_read: 0,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl VideoSource for FfmpegSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_next(&mut self) -> Result<Option<DecodedFrame>> {
        let len = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; len];
        match stdout.read_exact(&mut buf) {
            Ok(()) => {
                self.frames_read += 1;
                DecodedFrame::from_raw_rgb(self.width, self.height, buf).map(Some)
            }
            // A trailing partial frame is treated as the end of the stream.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("decoder reached end of stream after {} frames", self.frames_read);
                self.stdout = None;
                Ok(None)
            }
            Err(e) => Err(PlayerError::Decode(e)),
        }
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// The `ffmpeg` invocation that streams `path` as packed `rgb24` frames of
/// exactly `width`x`height`.
///
/// Rotation metadata is ignored and the output is scaled to the probed size, so
/// every frame on stdout has the row stride the reader expects.
fn decoder_command(path: &Path, config: &FfmpegConfig, width: u32, height: u32) -> ProcCommand {
    let mut cmd = ProcCommand::new(&config.ffmpeg_path);
    cmd.arg("-loglevel")
        .arg("error")
        .arg("-nostdin")
        .arg("-noautorotate")
        .arg("-i")
        .arg(path)
        .arg("-vf")
        .arg(format!("scale={}:{}", width, height))
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgb24")
        .arg("-");
    cmd
}

fn probe_dimensions(path: &Path, config: &FfmpegConfig) -> Result<(u32, u32)> {
    let output = ProcCommand::new(&config.ffprobe_path)
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height")
        .arg("-of")
        .arg("csv=s=x:p=0")
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| open_error(path, spawn_reason(&config.ffprobe_path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(open_error(
            path,
            format!("ffprobe failed ({}): {}", output.status, stderr.trim()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout).ok_or_else(|| {
        open_error(
            path,
            format!("no video stream dimensions in ffprobe output {:?}", stdout.trim()),
        )
    })
}

/// Parse `ffprobe`'s `WIDTHxHEIGHT` line.
pub(crate) fn parse_probe_output(s: &str) -> Option<(u32, u32)> {
    let line = s.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    // Some containers append a trailing separator.
    let h = h.trim_end_matches('x');
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn spawn_reason(program: &str, e: std::io::Error) -> String {
    if e.kind() == ErrorKind::NotFound {
        format!("{} not found; install ffmpeg or set its path in the config file", program)
    } else {
        format!("failed to run {}: {}", program, e)
    }
}

fn open_error(path: &Path, reason: String) -> PlayerError {
    PlayerError::SourceOpen {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(parse_probe_output("1920x1080\n"), Some((1920, 1080)));
        assert_eq!(parse_probe_output("\n 640x360x\n"), Some((640, 360)));
        assert_eq!(parse_probe_output(""), None);
        assert_eq!(parse_probe_output("N/AxN/A"), None);
        assert_eq!(parse_probe_output("0x480"), None);
    }

    #[test]
    fn test_decoder_output_pinned_to_probed_size() {
        let cmd = decoder_command(Path::new("portrait.mp4"), &FfmpegConfig::default(), 1920, 1080);
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        let pos = |flag: &str| args.iter().position(|a| a == flag);

        let input = pos("-i").unwrap();
        assert!(pos("-noautorotate").unwrap() < input, "{:?}", args);
        assert_eq!(args[input + 1], "portrait.mp4");
        let filter = pos("-vf").unwrap();
        assert!(filter > input);
        assert_eq!(args[filter + 1], "scale=1920:1080");
        assert_eq!(args[pos("-pix_fmt").unwrap() + 1], "rgb24");
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_open_with_missing_ffprobe_is_source_open_error() {
        let config = FfmpegConfig {
            ffmpeg_path: "ffmpeg".into(),
            ffprobe_path: "asciiplay-no-such-ffprobe".into(),
        };
        let err = FfmpegSource::open(Path::new("clip.mp4"), &config)
            .err()
            .expect("open should fail");
        match err {
            PlayerError::SourceOpen { path, reason } => {
                assert_eq!(path, PathBuf::from("clip.mp4"));
                assert!(reason.contains("not found"), "{}", reason);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_ffmpeg_config_defaults_from_empty_json() {
        let cfg: FfmpegConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, FfmpegConfig::default());
    }
}
