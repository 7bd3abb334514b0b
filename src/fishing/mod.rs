//! Fishing automation: the cast/bite/reel loop, the popup handler and catch data

pub mod catch;
pub mod catch_parser;
pub mod popup;
pub mod state;
pub mod worker;

pub use catch::{CatchRecord, Quality};
pub use catch_parser::{parse_catch, CatchParseError};
pub use popup::{PopupChoice, PopupTimings, PopupWorker};
pub use state::FishingState;
pub use worker::{CycleTimings, FishingWorker, Perception, ReelOutcome};
