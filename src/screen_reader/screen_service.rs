//! Screen capture service

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use image::RgbaImage;
use screenshots::Screen;

const CAPTURE_RETRIES: u32 = 3;
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Screen rectangle in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width as i32 / 2,
            self.top + self.height as i32 / 2,
        )
    }
}

/// Anything that can hand out screen pixels.
///
/// Implementations must be callable from several workers at once.
pub trait FrameSource: Send + Sync {
    /// Capture `region`, or the whole primary screen when `None`
    fn capture(&self, region: Option<Region>) -> Result<RgbaImage>;
}

/// Captures the primary display through `screenshots`.
///
/// Every capture opens its own screen handle; handles are never shared across
/// threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScreenService;

impl ScreenService {
    pub fn new() -> Self {
        Self
    }

    /// Physical size of the primary display
    pub fn primary_screen_size() -> Option<(u32, u32)> {
        let screens = Screen::all().ok()?;
        let screen = screens
            .iter()
            .find(|s| s.display_info.is_primary)
            .or_else(|| screens.first())?;
        let info = &screen.display_info;
        let scale = if info.scale_factor > 0.0 {
            info.scale_factor
        } else {
            1.0
        };
        Some((
            (info.width as f32 * scale).round() as u32,
            (info.height as f32 * scale).round() as u32,
        ))
    }

    /// Take a screenshot safely with retries
    pub fn safe_screenshot(&self, region: Option<Region>, retries: u32, delay: Duration) -> Result<RgbaImage> {
        let mut last_error = None;
        for i in 0..retries.max(1) {
            match Self::grab(region) {
                Ok(img) => return Ok(img),
                Err(e) => {
                    tracing::warn!("Screenshot failed: {}. Retrying ({}/{})", e, i + 1, retries);
                    last_error = Some(e);
                    thread::sleep(delay);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("screenshot failed")))
    }

    fn grab(region: Option<Region>) -> Result<RgbaImage> {
        let screens = Screen::all().context("Failed to get screens")?;
        let screen = screens
            .iter()
            .find(|s| s.display_info.is_primary)
            .or_else(|| screens.first())
            .context("No screens found")?;

        let image = match region {
            Some(r) => screen
                .capture_area(r.left, r.top, r.width, r.height)
                .context("Failed to capture area")?,
            None => screen.capture().context("Failed to capture screen")?,
        };

        // screenshots links its own image version, go through raw bytes
        RgbaImage::from_raw(image.width(), image.height(), image.to_vec())
            .context("Failed to create image from raw data")
    }
}

impl FrameSource for ScreenService {
    fn capture(&self, region: Option<Region>) -> Result<RgbaImage> {
        if let Some(r) = region {
            if r.width == 0 || r.height == 0 {
                anyhow::bail!("empty capture region {:?}", r);
            }
        }
        self.safe_screenshot(region, CAPTURE_RETRIES, CAPTURE_RETRY_DELAY)
    }
}
