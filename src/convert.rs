//! Decoded video frame to ASCII text conversion.
//!
//! Conversion is grayscale, then area-averaged resampling to the target grid,
//! then a lookup into a fixed 10-step character ramp. Nothing here touches I/O.

use std::fmt;

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};

/// Character ramp ordered from most ink to least ink.
pub const ASCII_RAMP: &[u8; 10] = b"@%#*+=-:. ";

/// Intensity span covered by a single ramp step.
pub const RAMP_STEP: u8 = 25;

const BLANK: char = ' ';

/// Largest per-axis shrink done in one resampling pass. `thumbnail` sums each
/// output cell in a `u32`, so a single pass over a huge frame can overflow.
const MAX_PASS_FACTOR: u32 = 64;

/// Output grid dimensions in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a size of `width` columns by `height` rows.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One decoded video frame as a grid of colour samples.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    image: DynamicImage,
}

impl DecodedFrame {
    /// Wrap an image of any pixel format.
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Wrap an 8-bit RGB image.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self::new(DynamicImage::ImageRgb8(image))
    }

    /// Wrap a packed `rgb24` buffer as produced by a raw video decoder.
    pub fn from_raw_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        RgbImage::from_raw(width, height, data)
            .map(Self::from_rgb)
            .ok_or_else(|| {
                PlayerError::InvalidFrame(format!(
                    "{} bytes cannot hold a {}x{} rgb24 frame",
                    len, width, height
                ))
            })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The underlying pixel data.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// A block of text holding exactly `size.height` lines of `size.width` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    text: String,
    size: FrameSize,
}

impl AsciiFrame {
    /// An all-space frame, used in place of frames that failed conversion.
    pub fn blank(size: FrameSize) -> Self {
        let row = BLANK.to_string().repeat(size.width as usize);
        let text = vec![row; size.height as usize].join("\n");
        Self { text, size }
    }

    /// Grid dimensions of this frame.
    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Rows joined by `\n`, without a trailing newline.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Iterate over the rows.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// True when every cell is a space.
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(|c| c == BLANK || c == '\n')
    }
}

impl fmt::Display for AsciiFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Convert one decoded frame into an ASCII frame of exactly `size`.
///
/// # Errors
///
/// [`PlayerError::InvalidFrame`] when the frame has no pixels or `size` is empty,
/// [`PlayerError::Conversion`] when resampling does not land on the requested grid.
pub fn convert(frame: &DecodedFrame, size: FrameSize) -> Result<AsciiFrame> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(PlayerError::InvalidFrame(format!(
            "decoded frame is empty ({}x{})",
            frame.width(),
            frame.height()
        )));
    }
    if size.is_empty() {
        return Err(PlayerError::InvalidFrame(format!("target size {} is empty", size)));
    }

    let gray = frame.image().to_luma8();
    let resampled = resample(&gray, size)?;
    Ok(map_to_ascii(&resampled))
}

/// Area-averaging resize to exactly `size`.
///
/// Large reductions run in several passes of at most [`MAX_PASS_FACTOR`] per axis.
fn resample(gray: &GrayImage, size: FrameSize) -> Result<GrayImage> {
    if gray.dimensions() == (size.width, size.height) {
        return Ok(gray.clone());
    }

    let mut staged: Option<GrayImage> = None;
    loop {
        let current = staged.as_ref().unwrap_or(gray);
        let (w, h) = current.dimensions();
        let next_w = intermediate_extent(w, size.width);
        let next_h = intermediate_extent(h, size.height);
        if (next_w, next_h) == (w, h) {
            break;
        }
        staged = Some(image::imageops::thumbnail(current, next_w, next_h));
    }

    let current = staged.as_ref().unwrap_or(gray);
    let out = image::imageops::thumbnail(current, size.width, size.height);
    if out.dimensions() != (size.width, size.height) {
        let (w, h) = out.dimensions();
        return Err(PlayerError::Conversion(format!(
            "resampled to {}x{} instead of {}",
            w, h, size
        )));
    }
    Ok(out)
}

/// Extent of the next resampling pass along one axis, or `from` when the final
/// pass can reach `target` directly.
fn intermediate_extent(from: u32, target: u32) -> u32 {
    if from <= target.saturating_mul(MAX_PASS_FACTOR) {
        from
    } else {
        from.div_ceil(MAX_PASS_FACTOR)
    }
}

fn map_to_ascii(gray: &GrayImage) -> AsciiFrame {
    let (w, h) = gray.dimensions();
    let mut text = String::with_capacity((w as usize + 1) * h as usize);
    for y in 0..h {
        if y > 0 {
            text.push('\n');
        }
        for x in 0..w {
            text.push(char_for(gray.get_pixel(x, y)[0]));
        }
    }
    AsciiFrame {
        text,
        size: FrameSize::new(w, h),
    }
}

/// Ramp character for a single intensity. Indices past the end clamp to the blank end.
pub fn char_for(luma: u8) -> char {
    let idx = (luma / RAMP_STEP) as usize;
    let idx = idx.min(ASCII_RAMP.len() - 1);
    ASCII_RAMP[idx] as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    fn solid(width: u32, height: u32, v: u8) -> DecodedFrame {
        DecodedFrame::from_rgb(RgbImage::from_pixel(width, height, Rgb([v, v, v])))
    }

    #[test]
    fn test_char_for_boundaries() {
        assert_eq!(char_for(0), '@');
        assert_eq!(char_for(24), '@');
        assert_eq!(char_for(25), '%');
        assert_eq!(char_for(125), '=');
        assert_eq!(char_for(224), ':');
        assert_eq!(char_for(225), ' ');
        assert_eq!(char_for(249), ' ');
        assert_eq!(char_for(250), ' ');
        assert_eq!(char_for(255), ' ');
    }

    #[test]
    fn test_char_for_is_monotonic() {
        let rank = |c: char| ASCII_RAMP.iter().position(|&b| b as char == c).unwrap();
        let mut prev = rank(char_for(0));
        for v in 1..=255u8 {
            let cur = rank(char_for(v));
            assert!(cur >= prev, "ramp index dropped at intensity {}", v);
            prev = cur;
        }
    }

    #[test]
    fn test_convert_shape_matches_target() {
        let frame = solid(64, 48, 90);
        for (w, h) in [(1, 1), (2, 1), (7, 3), (40, 12), (64, 48), (100, 60)] {
            let ascii = convert(&frame, FrameSize::new(w, h)).unwrap();
            let lines: Vec<&str> = ascii.lines().collect();
            assert_eq!(lines.len(), h as usize, "height for {}x{}", w, h);
            assert!(lines.iter().all(|l| l.chars().count() == w as usize));
            assert_eq!(ascii.size(), FrameSize::new(w, h));
        }
    }

    #[test]
    fn test_convert_solid_intensities() {
        let size = FrameSize::new(2, 1);
        assert_eq!(convert(&solid(8, 4, 0), size).unwrap().as_str(), "@@");
        assert_eq!(convert(&solid(8, 4, 125), size).unwrap().as_str(), "==");
        assert_eq!(convert(&solid(8, 4, 255), size).unwrap().as_str(), "  ");
    }

    #[test]
    fn test_convert_area_average_of_stripes() {
        // Alternating black and white columns average to mid-gray in one cell.
        let img = GrayImage::from_fn(4, 4, |x, _| if x % 2 == 0 { Luma([0]) } else { Luma([250]) });
        let frame = DecodedFrame::new(DynamicImage::ImageLuma8(img));
        let ascii = convert(&frame, FrameSize::new(1, 1)).unwrap();
        assert_eq!(ascii.as_str(), "=");
    }

    #[test]
    fn test_convert_huge_frame_to_single_cell() {
        let img = GrayImage::from_pixel(7680, 4320, Luma([255]));
        let frame = DecodedFrame::new(DynamicImage::ImageLuma8(img));
        let ascii = convert(&frame, FrameSize::new(1, 1)).unwrap();
        assert_eq!(ascii.as_str(), " ");
    }

    #[test]
    fn test_intermediate_extent_bounds_each_pass() {
        assert_eq!(intermediate_extent(64, 1), 64);
        assert_eq!(intermediate_extent(7680, 1), 120);
        assert_eq!(intermediate_extent(120, 1), 2);
        assert_eq!(intermediate_extent(6400, 100), 6400);
        assert_eq!(intermediate_extent(7680, 100), 120);
    }

    #[test]
    fn test_convert_is_deterministic() {
        let img = RgbImage::from_fn(30, 20, |x, y| Rgb([(x * 8) as u8, (y * 12) as u8, 77]));
        let frame = DecodedFrame::from_rgb(img);
        let size = FrameSize::new(10, 5);
        assert_eq!(convert(&frame, size).unwrap(), convert(&frame, size).unwrap());
    }

    #[test]
    fn test_convert_rejects_empty_frame() {
        let frame = DecodedFrame::from_rgb(RgbImage::new(0, 0));
        let err = convert(&frame, FrameSize::new(4, 2)).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidFrame(_)));
    }

    #[test]
    fn test_blank_frame_shape() {
        let blank = AsciiFrame::blank(FrameSize::new(3, 2));
        assert_eq!(blank.as_str(), "   \n   ");
        assert!(blank.is_blank());
        assert_eq!(blank.size(), FrameSize::new(3, 2));
    }

    #[test]
    fn test_from_raw_rgb_rejects_short_buffer() {
        let err = DecodedFrame::from_raw_rgb(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidFrame(_)));
        assert!(DecodedFrame::from_raw_rgb(2, 2, vec![0; 12]).is_ok());
    }
}
