//! Auto Angler - automated fishing for Blue Protocol: Star Resonance
//!
//! Reads the game screen with template matching and OCR, drives the mouse
//! through the cast / wait / reel cycle and transcribes each catch. A second
//! worker answers the time-extension popup.

pub mod config;
pub mod console;
pub mod controller;
pub mod events;
pub mod fishing;
pub mod input;
pub mod screen_reader;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::{Config, GlobalSettings, Preset};
pub use controller::Controller;
pub use events::{CoreEvent, EventSink};
pub use fishing::{CatchRecord, FishingState, FishingWorker, PopupWorker, Quality};
pub use input::InputSimulator;
pub use screen_reader::{RegionMapper, ScreenService, TemplateMatcher};
pub use utils::{keybinds, path::get_data_dir, PresetRequest, RunControl};
