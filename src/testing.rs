//! Test doubles for the perception and input seams

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::input::{InputBackend, InputError};
use crate::screen_reader::{
    FrameSource, MatchResult, RecognizerError, Region, TextRecognizer, Vision, VisionError,
};

const DEFAULT_CAPTURE: (u32, u32) = (64, 36);

/// Frame source that always returns the same image
pub struct StaticFrame {
    frame: RgbaImage,
}

impl StaticFrame {
    pub fn new(frame: RgbaImage) -> Self {
        Self { frame }
    }
}

impl FrameSource for StaticFrame {
    fn capture(&self, _region: Option<Region>) -> anyhow::Result<RgbaImage> {
        Ok(self.frame.clone())
    }
}

type Finder = Box<dyn Fn(&str, Option<Region>) -> bool + Send + Sync>;

/// Vision double driven by closures and scripted digit readings.
///
/// Digit readings are consumed in order; the last one repeats forever.
pub struct ScriptedVision {
    finder: Finder,
    digits: Mutex<Vec<Option<u32>>>,
    failing: bool,
}

impl ScriptedVision {
    pub fn new() -> Self {
        Self {
            finder: Box::new(|_, _| false),
            digits: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    /// Every call errors
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn with_finder<F>(mut self, finder: F) -> Self
    where
        F: Fn(&str, Option<Region>) -> bool + Send + Sync + 'static,
    {
        self.finder = Box::new(finder);
        self
    }

    pub fn with_digits<I>(self, readings: I) -> Self
    where
        I: IntoIterator<Item = Option<u32>>,
    {
        let mut readings: Vec<_> = readings.into_iter().collect();
        readings.reverse();
        *self.digits.lock() = readings;
        self
    }

    fn fail(&self) -> Result<(), VisionError> {
        if self.failing {
            return Err(VisionError::Capture(anyhow::anyhow!("scripted capture failure")));
        }
        Ok(())
    }
}

impl Vision for ScriptedVision {
    fn find(&self, template: &str, region: Option<Region>, _threshold: f64) -> Result<MatchResult, VisionError> {
        self.fail()?;
        if !(self.finder)(template, region) {
            return Ok(MatchResult::miss(0.0));
        }
        let center = region.map(|r| r.center()).unwrap_or((0, 0));
        Ok(MatchResult {
            found: true,
            center: Some(center),
            score: 1.0,
        })
    }

    fn read_digits(&self, _region: Region) -> Result<Option<u32>, VisionError> {
        self.fail()?;
        let mut readings = self.digits.lock();
        match readings.len() {
            0 => Ok(None),
            1 => Ok(readings[0]),
            _ => Ok(readings.pop().flatten()),
        }
    }

    fn capture(&self, region: Option<Region>) -> Result<RgbaImage, VisionError> {
        self.fail()?;
        let (w, h) = region
            .map(|r| (r.width.max(1), r.height.max(1)))
            .unwrap_or(DEFAULT_CAPTURE);
        Ok(RgbaImage::from_pixel(w, h, Rgba([40, 40, 40, 255])))
    }
}

/// Recognizer that returns fixed fragments
pub struct FixedRecognizer {
    fragments: Vec<String>,
}

impl FixedRecognizer {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TextRecognizer for FixedRecognizer {
    fn recognize(&self, _image: &RgbaImage) -> Result<Vec<String>, RecognizerError> {
        Ok(self.fragments.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Move(i32, i32),
    Down,
    Up,
}

/// Shared view of what a [`RecordingBackend`] was asked to do
#[derive(Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<InputAction>>>);

impl ActionLog {
    pub fn actions(&self) -> Vec<InputAction> {
        self.0.lock().clone()
    }

    fn push(&self, action: InputAction) {
        self.0.lock().push(action);
    }
}

pub struct RecordingBackend {
    log: ActionLog,
}

impl RecordingBackend {
    pub fn new() -> (Self, ActionLog) {
        let log = ActionLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl InputBackend for RecordingBackend {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.log.push(InputAction::Move(x, y));
        Ok(())
    }

    fn button_down(&mut self) -> Result<(), InputError> {
        self.log.push(InputAction::Down);
        Ok(())
    }

    fn button_up(&mut self) -> Result<(), InputError> {
        self.log.push(InputAction::Up);
        Ok(())
    }
}
