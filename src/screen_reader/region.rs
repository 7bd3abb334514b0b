//! Resolution-independent screen regions
//!
//! Every region and click point is authored against a 2560x1440 layout. The
//! game UI does not scale uniformly when the aspect ratio changes: some
//! widgets stick to the bottom edge, some to the horizontal center, some to a
//! corner. Each entry therefore carries an [`Anchor`] that decides which
//! distances are preserved when mapping to the real display.

use thiserror::Error;

use super::screen_service::Region;

pub const REFERENCE_WIDTH: f64 = 2560.0;
pub const REFERENCE_HEIGHT: f64 = 1440.0;

/// Width of the units digit slot inside `bait_count`, in reference pixels
pub const DIGIT_SLOT_WIDTH: f64 = 15.0;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("region '{0}' is not defined")]
    UnknownRegion(String),
    #[error("point '{0}' is not defined")]
    UnknownPoint(String),
}

/// Which part of the screen a reference rectangle keeps its distance to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Horizontal offset from the center line, vertical offset from the top
    TopCenter,
    /// Horizontal offset from the center line, vertical offset from the bottom
    BottomCenter,
    /// Offsets from the right and bottom edges
    BottomRight,
    /// Offsets from the screen center
    Center,
    /// Independent per-axis scaling
    Default,
}

impl Anchor {
    pub const ALL: [Anchor; 5] = [
        Anchor::TopCenter,
        Anchor::BottomCenter,
        Anchor::BottomRight,
        Anchor::Center,
        Anchor::Default,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Anchor::TopCenter => "top_center",
            Anchor::BottomCenter => "bottom_center",
            Anchor::BottomRight => "bottom_right",
            Anchor::Center => "center",
            Anchor::Default => "default",
        }
    }
}

/// Rectangle in reference-resolution pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub anchor: Anchor,
}

impl ReferenceRegion {
    pub const fn new(x: i32, y: i32, width: i32, height: i32, anchor: Anchor) -> Self {
        Self {
            x,
            y,
            width,
            height,
            anchor,
        }
    }
}

/// Click target in reference-resolution pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub x: i32,
    pub y: i32,
    pub anchor: Anchor,
}

pub const REGIONS: [(&str, ReferenceRegion); 8] = [
    ("cast_rod", ReferenceRegion::new(1092, 1323, 25, 32, Anchor::BottomCenter)),
    ("cast_rod_ice", ReferenceRegion::new(1203, 1323, 25, 32, Anchor::BottomCenter)),
    ("wait_bite", ReferenceRegion::new(980, 1323, 25, 32, Anchor::BottomCenter)),
    ("shangyu", ReferenceRegion::new(1146, 1316, 17, 21, Anchor::BottomCenter)),
    ("reel_in_star", ReferenceRegion::new(1172, 165, 34, 34, Anchor::TopCenter)),
    ("bait_count", ReferenceRegion::new(2318, 1296, 30, 22, Anchor::BottomRight)),
    ("jiashi_popup", ReferenceRegion::new(1244, 676, 27, 28, Anchor::Center)),
    ("ocr_area", ReferenceRegion::new(915, 75, 725, 150, Anchor::TopCenter)),
];

pub const POINTS: [(&str, ReferencePoint); 2] = [
    (
        "btn_jiashi_no",
        ReferencePoint {
            x: 1175,
            y: 778,
            anchor: Anchor::Center,
        },
    ),
    (
        "btn_jiashi_yes",
        ReferencePoint {
            x: 1390,
            y: 778,
            anchor: Anchor::Center,
        },
    ),
];

/// Maps reference regions onto the current display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMapper {
    screen_width: u32,
    screen_height: u32,
    scale_x: f64,
    scale_y: f64,
    scale: f64,
}

impl RegionMapper {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        let scale_x = f64::from(screen_width) / REFERENCE_WIDTH;
        let scale_y = f64::from(screen_height) / REFERENCE_HEIGHT;
        Self {
            screen_width,
            screen_height,
            scale_x,
            scale_y,
            scale: scale_y,
        }
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    /// Uniform factor (height ratio) used for anchored regions and templates
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Scale a reference length by the uniform factor, at least 1px
    pub fn scale_length(&self, reference: f64) -> u32 {
        (reference * self.scale).round().max(1.0) as u32
    }

    pub fn resolve(&self, name: &str) -> Result<Region, RegionError> {
        let reference = REGIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| *r)
            .ok_or_else(|| RegionError::UnknownRegion(name.to_string()))?;
        Ok(self.resolve_region(&reference))
    }

    pub fn resolve_point(&self, name: &str) -> Result<(i32, i32), RegionError> {
        let reference = POINTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
            .ok_or_else(|| RegionError::UnknownPoint(name.to_string()))?;
        Ok(self.map_point(&reference))
    }

    pub fn resolve_region(&self, reference: &ReferenceRegion) -> Region {
        let screen_w = f64::from(self.screen_width);
        let screen_h = f64::from(self.screen_height);
        let x = f64::from(reference.x);
        let y = f64::from(reference.y);
        let w = f64::from(reference.width);
        let h = f64::from(reference.height);

        let new_w = (w * self.scale).round();
        let new_h = (h * self.scale).round();
        let center_x = screen_w / 2.0 + (x + w / 2.0 - REFERENCE_WIDTH / 2.0) * self.scale;

        let (left, top) = match reference.anchor {
            Anchor::TopCenter => (center_x - new_w / 2.0, y * self.scale),
            Anchor::BottomCenter => (
                center_x - new_w / 2.0,
                screen_h - (REFERENCE_HEIGHT - y) * self.scale,
            ),
            Anchor::BottomRight => (
                screen_w - (REFERENCE_WIDTH - x) * self.scale,
                screen_h - (REFERENCE_HEIGHT - y) * self.scale,
            ),
            Anchor::Center => {
                let center_y = screen_h / 2.0 + (y + h / 2.0 - REFERENCE_HEIGHT / 2.0) * self.scale;
                (center_x - new_w / 2.0, center_y - new_h / 2.0)
            }
            Anchor::Default => {
                return Region::new(
                    round(x * self.scale_x),
                    round(y * self.scale_y),
                    round_len(w * self.scale_x),
                    round_len(h * self.scale_y),
                );
            }
        };

        Region::new(round(left), round(top), round_len(new_w), round_len(new_h))
    }

    pub fn map_point(&self, point: &ReferencePoint) -> (i32, i32) {
        match point.anchor {
            Anchor::Center => {
                let x = f64::from(self.screen_width) / 2.0
                    + (f64::from(point.x) - REFERENCE_WIDTH / 2.0) * self.scale_x;
                let y = f64::from(self.screen_height) / 2.0
                    + (f64::from(point.y) - REFERENCE_HEIGHT / 2.0) * self.scale_y;
                (round(x), round(y))
            }
            anchor => {
                let region =
                    self.resolve_region(&ReferenceRegion::new(point.x, point.y, 0, 0, anchor));
                (region.left, region.top)
            }
        }
    }

    /// Every named region and point resolved, formatted for a debug listing
    pub fn describe_all(&self) -> Vec<String> {
        let regions = REGIONS.iter().map(|(name, reference)| {
            let r = self.resolve_region(reference);
            format!(
                "{:<14} {:<13} x={} y={} w={} h={}",
                name,
                reference.anchor.name(),
                r.left,
                r.top,
                r.width,
                r.height
            )
        });
        let points = POINTS.iter().map(|(name, point)| {
            let (x, y) = self.map_point(point);
            format!("{:<14} {:<13} x={} y={}", name, point.anchor.name(), x, y)
        });
        regions.chain(points).collect()
    }
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

fn round_len(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREENS: [(u32, u32); 6] = [
        (2560, 1440),
        (1920, 1080),
        (3840, 2160),
        (1280, 720),
        (3440, 1440),
        (1680, 1050),
    ];

    #[test]
    fn test_reference_resolution_round_trip() {
        let mapper = RegionMapper::new(2560, 1440);
        for anchor in Anchor::ALL {
            for (name, reference) in REGIONS {
                let reference = ReferenceRegion { anchor, ..reference };
                let region = mapper.resolve_region(&reference);
                assert_eq!(
                    (region.left, region.top, region.width as i32, region.height as i32),
                    (reference.x, reference.y, reference.width, reference.height),
                    "{} with {:?}",
                    name,
                    anchor
                );
            }
            let point = ReferencePoint { x: 1175, y: 778, anchor };
            assert_eq!(mapper.map_point(&point), (1175, 778), "{:?}", anchor);
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        for (w, h) in SCREENS {
            let mapper = RegionMapper::new(w, h);
            for anchor in Anchor::ALL {
                for (_, reference) in REGIONS {
                    let reference = ReferenceRegion { anchor, ..reference };
                    let first = mapper.resolve_region(&reference);
                    let second = mapper.resolve_region(&reference);
                    assert_eq!(
                        (first.left, first.top, first.width, first.height),
                        (second.left, second.top, second.width, second.height)
                    );
                }
            }
        }
    }

    #[test]
    fn test_bottom_right_tracks_corner_on_ultrawide() {
        let mapper = RegionMapper::new(3440, 1440);
        let region = mapper.resolve("bait_count").unwrap();
        // same distance from the bottom-right corner as on 2560x1440
        assert_eq!(region.left, 3440 - (2560 - 2318));
        assert_eq!(region.top, 1296);
        assert_eq!((region.width, region.height), (30, 22));
    }

    #[test]
    fn test_top_center_at_1080p() {
        let mapper = RegionMapper::new(1920, 1080);
        let region = mapper.resolve("ocr_area").unwrap();
        // center offset (915 + 362.5 - 1280) * 0.75 = -1.875 around x=960
        assert_eq!(region.width, 544);
        assert_eq!(region.height, 113);
        assert_eq!(region.top, 56);
        assert_eq!(region.left, (958.125f64 - 272.0).round() as i32);
    }

    #[test]
    fn test_bottom_center_keeps_bottom_distance() {
        let mapper = RegionMapper::new(1920, 1080);
        let region = mapper.resolve("cast_rod").unwrap();
        assert_eq!(region.top, (1080.0f64 - 117.0 * 0.75).round() as i32);
    }

    #[test]
    fn test_center_points_use_axis_scales() {
        let mapper = RegionMapper::new(3440, 1440);
        let (x, y) = mapper.resolve_point("btn_jiashi_no").unwrap();
        let expected_x = 1720.0 + (1175.0 - 1280.0) * (3440.0 / 2560.0);
        assert_eq!(x, expected_x.round() as i32);
        assert_eq!(y, 778);
    }

    #[test]
    fn test_unknown_names() {
        let mapper = RegionMapper::new(1920, 1080);
        assert_eq!(
            mapper.resolve("nope").unwrap_err(),
            RegionError::UnknownRegion("nope".into())
        );
        assert_eq!(
            mapper.resolve_point("cast_rod").unwrap_err(),
            RegionError::UnknownPoint("cast_rod".into())
        );
    }

    #[test]
    fn test_describe_all_lists_everything() {
        let lines = RegionMapper::new(1920, 1080).describe_all();
        assert_eq!(lines.len(), REGIONS.len() + POINTS.len());
        assert!(lines[0].starts_with("cast_rod"));
    }
}
