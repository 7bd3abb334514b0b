//! Screen reader module for capturing and analyzing screen content

pub mod digits;
pub mod region;
pub mod screen_service;
pub mod template_matcher;
pub mod text_recognizer;

pub use region::{Anchor, RegionError, RegionMapper};
pub use screen_service::{FrameSource, Region, ScreenService};
pub use template_matcher::{MatchResult, Template, TemplateMatcher, Vision, VisionError};
pub use text_recognizer::{RecognizerError, TesseractRecognizer, TextRecognizer};
