//! Text recognition over captured regions

use std::collections::HashMap;

use image::{DynamicImage, RgbaImage};
use rusty_tesseract::{Args, Image as TessImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("could not hand image to tesseract: {0}")]
    Image(String),
    #[error("tesseract failed: {0}")]
    Engine(String),
}

/// Black-box OCR engine: image in, text fragments out
pub trait TextRecognizer: Send {
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<String>, RecognizerError>;
}

/// Tesseract through `rusty-tesseract`, simplified Chinese model
pub struct TesseractRecognizer {
    args: Args,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::with_language("chi_sim")
    }

    pub fn with_language(lang: &str) -> Self {
        Self {
            args: Args {
                lang: lang.to_string(),
                config_variables: HashMap::new(),
                dpi: Some(150),
                psm: Some(6), // uniform block; the catch banner spans two lines
                oem: Some(3),
            },
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<String>, RecognizerError> {
        let dynamic = DynamicImage::ImageRgba8(image.clone());
        let tess_image =
            TessImage::from_dynamic_image(&dynamic).map_err(|e| RecognizerError::Image(format!("{:?}", e)))?;
        let text = rusty_tesseract::image_to_string(&tess_image, &self.args)
            .map_err(|e| RecognizerError::Engine(format!("{:?}", e)))?;
        tracing::debug!("[OCR] raw output: {:?}", text);
        Ok(split_fragments(&text))
    }
}

/// Non-empty trimmed lines
pub fn split_fragments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
