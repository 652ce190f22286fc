//! Conversion of captured frames into displayable images.

use crate::{DepthFrame, DisparityFrame, DisplayImage, Pixels};

/// Depth that maps to black; zero maps to white.
pub const DEPTH_DISPLAY_MAX_MM: f64 = 10_000.0;

pub const DEPTH_WINDOW: &str = "Depth";
pub const DISPARITY_WINDOW: &str = "Disparity";

/// Linear map of one depth sample onto 8-bit gray, closer is brighter.
pub fn depth_sample_to_gray(v: i16) -> u8 {
    let scaled = -255.0 / DEPTH_DISPLAY_MAX_MM * f64::from(v) + 255.0;
    scaled.round().clamp(0.0, 255.0) as u8
}

pub fn depth_to_gray8(frame: &DepthFrame) -> Option<DisplayImage> {
    if frame.is_empty() {
        return None;
    }
    let pixels = frame.data.iter().copied().map(depth_sample_to_gray).collect();
    Some(DisplayImage {
        width: frame.width,
        height: frame.height,
        pixels: Pixels::Gray8(pixels),
    })
}

/// Disparity is shown as-is; the display surface decides how floats map to
/// intensity.
pub fn disparity_to_image(frame: &DisparityFrame) -> Option<DisplayImage> {
    if frame.is_empty() {
        return None;
    }
    Some(DisplayImage {
        width: frame.width,
        height: frame.height,
        pixels: Pixels::Float32(frame.data.clone()),
    })
}
