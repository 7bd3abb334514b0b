//! Small shared helpers

pub mod keybinds;
pub mod path;
pub mod run_control;

pub use run_control::{PresetRequest, RunControl};
