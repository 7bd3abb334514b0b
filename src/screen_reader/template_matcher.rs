//! Template matching against captured screen regions
//!
//! Templates are kept as `image` buffers and turned into OpenCV matrices per
//! call, which keeps the matcher `Sync` so both workers can share one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use once_cell::sync::OnceCell;
use opencv::{
    core::{min_max_loc, no_array, Mat, MatTraitConst, Point, CV_8UC1, CV_8UC3, CV_8UC4},
    imgproc,
    prelude::*,
};
use thiserror::Error;

use super::digits::{self, DigitHit, SlotOutcome, SlotReading};
use super::region::{RegionMapper, DIGIT_SLOT_WIDTH};
use super::screen_service::{FrameSource, Region};

/// Score a digit glyph needs to count as read
pub const DIGIT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("template '{0}' not found")]
    UnknownTemplate(String),
    #[error("failed to read templates from {path:?}: {source}")]
    Resources {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("screen capture failed: {0:#}")]
    Capture(anyhow::Error),
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Outcome of a single template search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub found: bool,
    /// Match center in absolute screen pixels, set only when found
    pub center: Option<(i32, i32)>,
    pub score: f64,
}

impl MatchResult {
    pub fn miss(score: f64) -> Self {
        Self {
            found: false,
            center: None,
            score,
        }
    }
}

/// Perception operations the workers depend on
pub trait Vision: Send + Sync {
    /// Search `region` (whole screen when `None`) for a named template
    fn find(&self, template: &str, region: Option<Region>, threshold: f64) -> Result<MatchResult, VisionError>;

    /// Read a one or two digit counter inside `region`
    fn read_digits(&self, region: Region) -> Result<Option<u32>, VisionError>;

    /// Raw capture for OCR and screenshots
    fn capture(&self, region: Option<Region>) -> Result<RgbaImage, VisionError>;
}

/// Reference bitmap in one of the three forms the matcher understands
#[derive(Debug, Clone)]
pub enum Template {
    /// Single channel; the frame is converted to gray before matching
    Gray(GrayImage),
    /// Opaque color
    Color(RgbImage),
    /// Color with an alpha mask; only opaque pixels take part in matching
    Masked { color: RgbImage, mask: GrayImage },
}

impl Template {
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let color = img.color();
        if color.has_alpha() {
            let rgba = img.to_rgba8();
            let mask = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                image::Luma([rgba.get_pixel(x, y)[3]])
            });
            Template::Masked {
                color: DynamicImage::ImageRgba8(rgba).to_rgb8(),
                mask,
            }
        } else if color.has_color() {
            Template::Color(img.to_rgb8())
        } else {
            Template::Gray(img.to_luma8())
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Template::Gray(img) => img.dimensions(),
            Template::Color(img) => img.dimensions(),
            Template::Masked { color, .. } => color.dimensions(),
        }
    }

    /// Resize by `scale`, truncating to whole pixels
    pub fn scaled(self, scale: f64) -> Self {
        if (scale - 1.0).abs() < f64::EPSILON {
            return self;
        }
        let (w, h) = self.dimensions();
        let nw = ((f64::from(w) * scale) as u32).max(1);
        let nh = ((f64::from(h) * scale) as u32).max(1);
        match self {
            Template::Gray(img) => Template::Gray(imageops::resize(&img, nw, nh, FilterType::Triangle)),
            Template::Color(img) => Template::Color(imageops::resize(&img, nw, nh, FilterType::Triangle)),
            Template::Masked { color, mask } => Template::Masked {
                color: imageops::resize(&color, nw, nh, FilterType::Triangle),
                mask: imageops::resize(&mask, nw, nh, FilterType::Triangle),
            },
        }
    }
}

/// Load every `*.png` under `dir`, keyed by file stem and scaled by `scale`
pub fn load_library(dir: &Path, scale: f64) -> Result<HashMap<String, Template>, VisionError> {
    let entries = fs::read_dir(dir).map_err(|source| VisionError::Resources {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut library = HashMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match image::open(&path) {
            Ok(img) => {
                library.insert(name.to_string(), Template::from_dynamic(img).scaled(scale));
            }
            Err(e) => tracing::warn!("[IMAGE] Skipping unreadable template {:?}: {}", path, e),
        }
    }

    tracing::info!("[IMAGE] Loaded {} templates from {:?}", library.len(), dir);
    Ok(library)
}

/// Copy raw 8-bit pixels into an owned Mat
fn raw_to_mat(width: u32, height: u32, channels: usize, data: &[u8]) -> opencv::Result<Mat> {
    let typ = match channels {
        1 => CV_8UC1,
        3 => CV_8UC3,
        _ => CV_8UC4,
    };
    let step = width as usize * channels;
    // the borrowed Mat never outlives `data`; try_clone makes an owned copy
    let borrowed = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            height as i32,
            width as i32,
            typ,
            data.as_ptr() as *mut std::ffi::c_void,
            step,
        )?
    };
    borrowed.try_clone()
}

fn gray_to_mat(img: &GrayImage) -> opencv::Result<Mat> {
    raw_to_mat(img.width(), img.height(), 1, img.as_raw())
}

fn rgb_to_mat(img: &RgbImage) -> opencv::Result<Mat> {
    raw_to_mat(img.width(), img.height(), 3, img.as_raw())
}

fn frame_to_mat(img: &RgbaImage) -> opencv::Result<Mat> {
    raw_to_mat(img.width(), img.height(), 4, img.as_raw())
}

/// Frame in the layouts templates are compared against
struct PreparedFrame {
    gray: Mat,
    rgb: Mat,
}

impl PreparedFrame {
    fn new(frame: &RgbaImage) -> opencv::Result<Self> {
        let rgba = frame_to_mat(frame)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&rgba, &mut gray, imgproc::COLOR_RGBA2GRAY, 0)?;
        let mut rgb = Mat::default();
        imgproc::cvt_color(&rgba, &mut rgb, imgproc::COLOR_RGBA2RGB, 0)?;
        Ok(Self { gray, rgb })
    }

    fn size(&self) -> (i32, i32) {
        (self.gray.cols(), self.gray.rows())
    }

    /// Normalized correlation surface for `template`, `None` if it does not fit
    fn correlate(&self, template: &Template) -> opencv::Result<Option<Mat>> {
        let (tw, th) = template.dimensions();
        let (fw, fh) = self.size();
        if tw as i32 > fw || th as i32 > fh {
            return Ok(None);
        }

        let mut result = Mat::default();
        match template {
            Template::Gray(img) => {
                let templ = gray_to_mat(img)?;
                imgproc::match_template(&self.gray, &templ, &mut result, imgproc::TM_CCOEFF_NORMED, &no_array())?;
            }
            Template::Color(img) => {
                let templ = rgb_to_mat(img)?;
                imgproc::match_template(&self.rgb, &templ, &mut result, imgproc::TM_CCOEFF_NORMED, &no_array())?;
            }
            Template::Masked { color, mask } => {
                let templ = rgb_to_mat(color)?;
                let mask = gray_to_mat(mask)?;
                imgproc::match_template(&self.rgb, &templ, &mut result, imgproc::TM_CCORR_NORMED, &mask)?;
            }
        }
        Ok(Some(result))
    }

    /// Best score and its top-left corner
    fn best(&self, template: &Template) -> opencv::Result<(f64, Point)> {
        let Some(result) = self.correlate(template)? else {
            return Ok((0.0, Point::new(0, 0)));
        };
        let mut max_val = 0.0;
        let mut max_loc = Point::new(0, 0);
        min_max_loc(&result, None, Some(&mut max_val), None, Some(&mut max_loc), &no_array())?;
        if !max_val.is_finite() {
            max_val = 0.0;
        }
        Ok((max_val, max_loc))
    }

    /// Every x position where `template` scores at least `threshold`
    fn hits(&self, template: &Template, digit: u8, threshold: f64, out: &mut Vec<DigitHit>) -> opencv::Result<()> {
        let Some(result) = self.correlate(template)? else {
            return Ok(());
        };
        for y in 0..result.rows() {
            for x in 0..result.cols() {
                let score = f64::from(*result.at_2d::<f32>(y, x)?);
                if score.is_finite() && score >= threshold {
                    out.push(DigitHit { digit, x, score });
                }
            }
        }
        Ok(())
    }
}

fn digit_name(digit: u8) -> String {
    format!("{}_grayscale", digit)
}

/// Template matcher backed by a [`FrameSource`]
pub struct TemplateMatcher {
    source: Arc<dyn FrameSource>,
    resources: PathBuf,
    scale: f64,
    slot_width: u32,
    templates: OnceCell<HashMap<String, Template>>,
}

impl TemplateMatcher {
    /// Matcher that loads templates from `resources` on first use
    pub fn new(source: Arc<dyn FrameSource>, resources: PathBuf, mapper: &RegionMapper) -> Self {
        Self {
            source,
            resources,
            scale: mapper.scale(),
            slot_width: mapper.scale_length(DIGIT_SLOT_WIDTH),
            templates: OnceCell::new(),
        }
    }

    /// Matcher over an already built library
    pub fn with_templates(source: Arc<dyn FrameSource>, templates: HashMap<String, Template>, slot_width: u32) -> Self {
        Self {
            source,
            resources: PathBuf::new(),
            scale: 1.0,
            slot_width,
            templates: OnceCell::with_value(templates),
        }
    }

    /// Load the library now instead of on the first search.
    ///
    /// Call before handing the matcher to worker threads.
    pub fn preload(&self) -> Result<usize, VisionError> {
        Ok(self.library()?.len())
    }

    fn library(&self) -> Result<&HashMap<String, Template>, VisionError> {
        self.templates
            .get_or_try_init(|| load_library(&self.resources, self.scale))
    }

    fn template(&self, name: &str) -> Result<&Template, VisionError> {
        self.library()?
            .get(name)
            .ok_or_else(|| VisionError::UnknownTemplate(name.to_string()))
    }

    /// Match a named template against an already captured frame.
    ///
    /// `origin` is the frame's top-left corner on screen.
    pub fn find_in_frame(
        &self,
        frame: &RgbaImage,
        origin: (i32, i32),
        name: &str,
        threshold: f64,
    ) -> Result<MatchResult, VisionError> {
        let template = self.template(name)?;
        let prepared = PreparedFrame::new(frame)?;
        let (score, loc) = prepared.best(template)?;

        if score < threshold {
            tracing::trace!("[IMAGE] '{}' NOT FOUND - score={:.3} < threshold={:.2}", name, score, threshold);
            return Ok(MatchResult::miss(score));
        }

        let (tw, th) = template.dimensions();
        let center = (
            origin.0 + loc.x + tw as i32 / 2,
            origin.1 + loc.y + th as i32 / 2,
        );
        tracing::debug!(
            "[IMAGE] FOUND '{}' at ({}, {}) with score={:.3} >= threshold={:.2}",
            name,
            center.0,
            center.1,
            score,
            threshold
        );
        Ok(MatchResult {
            found: true,
            center: Some(center),
            score,
        })
    }

    /// Best digit glyph for a slot image, regardless of threshold
    fn read_slot(&self, frame: &PreparedFrame) -> Result<Option<SlotReading>, VisionError> {
        let library = self.library()?;
        let mut scores = Vec::with_capacity(10);
        for digit in 0..10u8 {
            let Some(template) = library.get(&digit_name(digit)) else {
                continue;
            };
            let (score, _) = frame.best(template)?;
            scores.push((digit, score));
        }
        Ok(digits::best_reading(scores))
    }

    /// Scan the whole frame for every glyph occurrence
    fn scan_digits(&self, frame: &PreparedFrame) -> Result<Option<u32>, VisionError> {
        let library = self.library()?;
        let mut hits = Vec::new();
        for digit in 0..10u8 {
            if let Some(template) = library.get(&digit_name(digit)) {
                frame.hits(template, digit, DIGIT_THRESHOLD, &mut hits)?;
            }
        }
        let kept = digits::dedupe_hits(hits);
        tracing::trace!("[IMAGE] digit scan kept {:?}", kept);
        Ok(digits::hits_to_number(&kept))
    }

    /// Read a counter from a captured frame.
    ///
    /// The rightmost slot-width slice holds the units digit and the rest the
    /// tens digit; an unreadable units slice falls back to a whole-frame scan.
    pub fn read_digits_in_frame(&self, frame: &RgbaImage) -> Result<Option<u32>, VisionError> {
        let (w, h) = frame.dimensions();
        if w <= self.slot_width {
            return self.scan_digits(&PreparedFrame::new(frame)?);
        }

        let split = w - self.slot_width;
        let tens_img = imageops::crop_imm(frame, 0, 0, split, h).to_image();
        let units_img = imageops::crop_imm(frame, split, 0, self.slot_width, h).to_image();

        let tens = self.read_slot(&PreparedFrame::new(&tens_img)?)?;
        let units = self.read_slot(&PreparedFrame::new(&units_img)?)?;
        tracing::trace!("[IMAGE] digit slots tens={:?} units={:?}", tens, units);

        match digits::combine_slots(tens, units, DIGIT_THRESHOLD) {
            SlotOutcome::Value(value) => Ok(Some(value)),
            SlotOutcome::Scan => self.scan_digits(&PreparedFrame::new(frame)?),
            SlotOutcome::Ambiguous => {
                let scanned = self.scan_digits(&PreparedFrame::new(frame)?)?;
                if scanned.is_none() {
                    tracing::debug!("[IMAGE] tens slot unreadable, discarding units-only reading");
                }
                Ok(scanned)
            }
        }
    }
}

impl Vision for TemplateMatcher {
    fn find(&self, template: &str, region: Option<Region>, threshold: f64) -> Result<MatchResult, VisionError> {
        // unknown names fail before any capture
        self.template(template)?;
        let frame = self.capture(region)?;
        let origin = region.map(|r| (r.left, r.top)).unwrap_or((0, 0));
        self.find_in_frame(&frame, origin, template, threshold)
    }

    fn read_digits(&self, region: Region) -> Result<Option<u32>, VisionError> {
        let frame = self.capture(Some(region))?;
        self.read_digits_in_frame(&frame)
    }

    fn capture(&self, region: Option<Region>) -> Result<RgbaImage, VisionError> {
        self.source.capture(region).map_err(VisionError::Capture)
    }
}
