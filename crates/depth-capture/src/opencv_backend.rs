use std::time::Duration;

use opencv::prelude::*;
use opencv::{core, highgui};

use crate::{DisplayImage, DisplaySurface, Error, Key, Pixels, Result};

/// HighGUI windows. 8-bit images are shown as-is; float images follow
/// HighGUI's convention of mapping [0, 1] to black..white.
#[derive(Default)]
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    pub fn new() -> Self {
        Self
    }
}

fn backend(e: opencv::Error) -> Error {
    Error::Backend(e.to_string())
}

impl DisplaySurface for HighGuiDisplay {
    fn show(&mut self, window: &str, image: &DisplayImage) -> Result<()> {
        let rows = image.height as i32;
        match &image.pixels {
            Pixels::Gray8(data) => {
                let mat = core::Mat::from_slice(data).map_err(backend)?;
                let gray = mat.reshape(1, rows).map_err(backend)?;
                highgui::imshow(window, &gray).map_err(backend)?;
            }
            Pixels::Float32(data) => {
                let mat = core::Mat::from_slice(data).map_err(backend)?;
                let disp = mat.reshape(1, rows).map_err(backend)?;
                highgui::imshow(window, &disp).map_err(backend)?;
            }
        }
        Ok(())
    }

    fn destroy_all(&mut self) -> Result<()> {
        highgui::destroy_all_windows().map_err(backend)
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        let delay = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let code = highgui::wait_key(delay).map_err(backend)?;
        if code < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((code & 0xFF) as u32).map(Key))
    }
}
