//! The automation loop: cast, wait for a bite, reel, record, repeat
//!
//! [`FishingWorker::run`] is the thread body. The loop polls its
//! [`RunControl`] between steps and every wait goes through
//! [`RunControl::smart_sleep`], so a pause or stop is honoured within one
//! sleep slice plus the capture or input call in flight. Whatever goes wrong
//! inside a step is turned into a pause with a reason; the thread itself only
//! ends on stop.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use image::RgbaImage;

use super::catch::Quality;
use super::catch_parser;
use super::state::FishingState;
use crate::config::{Config, Preset};
use crate::events::EventSink;
use crate::input::InputSimulator;
use crate::screen_reader::{Region, RegionMapper, TextRecognizer, Vision};
use crate::utils::path::get_data_dir;
use crate::utils::{PresetRequest, RunControl};

/// Either prompt may be shown depending on the key binding
pub const CAST_PROMPTS: [&str; 2] = ["F1_grayscale", "F2_grayscale"];
pub const PROMPT_THRESHOLD: f64 = 0.8;
pub const STAR_THRESHOLD: f64 = 0.7;
pub const COLLECT_THRESHOLD: f64 = 0.8;

pub const REASON_OUT_OF_BAIT: &str = "out of bait";
pub const REASON_INVENTORY_FULL: &str = "possible inventory full";

const PAUSED_POLL: Duration = Duration::from_millis(100);
/// Ceiling for any configured wait
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed waits of one cycle
#[derive(Debug, Clone)]
pub struct CycleTimings {
    pub cast_prompt_timeout: Duration,
    pub post_cast_settle: Duration,
    pub verify_window: Duration,
    pub poll: Duration,
    pub baseline_attempts: u32,
    pub baseline_retry: Duration,
    pub bite_timeout: Duration,
    pub bite_poll: Duration,
    pub record_settle: Duration,
    pub dismiss_delay: Duration,
    pub after_dismiss: Duration,
}

impl Default for CycleTimings {
    fn default() -> Self {
        Self {
            cast_prompt_timeout: Duration::from_secs(10),
            post_cast_settle: Duration::from_secs(1),
            verify_window: Duration::from_secs(5),
            poll: Duration::from_millis(200),
            baseline_attempts: 3,
            baseline_retry: Duration::from_millis(500),
            bite_timeout: Duration::from_secs(120),
            bite_poll: Duration::from_millis(200),
            record_settle: Duration::from_secs(1),
            dismiss_delay: Duration::from_millis(500),
            after_dismiss: Duration::from_secs(1),
        }
    }
}

/// How a reeling phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelOutcome {
    Landed,
    Escaped,
    Exhausted,
    Interrupted,
}

/// Sensing side of the worker
pub struct Perception {
    pub vision: Arc<dyn Vision>,
    pub recognizer: Box<dyn TextRecognizer>,
    pub mapper: RegionMapper,
}

/// Seconds from config as a duration, clamped to `[0, MAX_WAIT]`
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0))
        .unwrap_or(MAX_WAIT)
        .min(MAX_WAIT)
}

pub struct FishingWorker {
    vision: Arc<dyn Vision>,
    recognizer: Box<dyn TextRecognizer>,
    mapper: RegionMapper,
    input: InputSimulator,
    config: Config,
    control: Arc<RunControl>,
    presets: Arc<PresetRequest>,
    events: EventSink,
    state: FishingState,
    timings: CycleTimings,
    data_dir: PathBuf,
    pause_observed: bool,
}

impl FishingWorker {
    pub fn new(
        perception: Perception,
        input: InputSimulator,
        config: Config,
        control: Arc<RunControl>,
        presets: Arc<PresetRequest>,
        events: EventSink,
    ) -> Self {
        Self {
            vision: perception.vision,
            recognizer: perception.recognizer,
            mapper: perception.mapper,
            input,
            config,
            control,
            presets,
            events,
            state: FishingState::default(),
            timings: CycleTimings::default(),
            data_dir: get_data_dir(),
            pause_observed: false,
        }
    }

    pub fn with_timings(mut self, timings: CycleTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Where debug crops and legendary screenshots go
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = dir;
        self
    }

    pub fn state(&self) -> FishingState {
        self.state
    }

    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    fn preset(&self) -> &Preset {
        self.config.active_preset()
    }

    fn region(&self, name: &str) -> Result<Region> {
        Ok(self.mapper.resolve(name)?)
    }

    fn transition(&mut self, next: FishingState) {
        if self.state != next {
            tracing::debug!("[FISH] {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Thread body; returns once the control is stopped.
    ///
    /// The control must already be started.
    pub fn run(mut self) {
        self.environment_check();
        self.events.log("automation loop ready");

        while self.control.is_running() {
            self.apply_pending_preset();

            if self.control.is_paused() {
                if !self.pause_observed {
                    self.enter_paused();
                }
                thread::sleep(PAUSED_POLL);
                continue;
            }
            self.pause_observed = false;

            self.guarded_step();

            let interval = secs(self.preset().cycle_interval);
            self.control.smart_sleep(interval);
        }

        self.input.ensure_released();
        self.events.log("automation loop stopped");
    }

    /// Run one step, converting errors and panics into a pause
    pub fn guarded_step(&mut self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.step()));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("error: {:#}", e),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                format!("panic: {}", message)
            }
        };
        tracing::error!("[FISH] step failed in {}: {}", self.state, reason);
        self.events.log(format!("step failed: {}", reason));
        self.pause_with_reason(&reason);
    }

    /// Advance the state machine by one state
    pub fn step(&mut self) -> Result<()> {
        match self.state {
            FishingState::FindingPrompt => {
                if self.cast_rod()? {
                    self.transition(FishingState::WaitingForBite);
                }
            }
            FishingState::WaitingForBite => {
                let next = if self.wait_for_bite()? {
                    FishingState::ReelingIn
                } else {
                    FishingState::FindingPrompt
                };
                self.transition(next);
            }
            FishingState::ReelingIn => {
                let outcome = self.reel_in()?;
                // every outcome starts the next cycle from scratch
                self.transition(FishingState::FindingPrompt);
                if outcome == ReelOutcome::Landed {
                    self.record_catch()?;
                    self.events.log("catch stowed, preparing next cycle");
                    if self.control.smart_sleep(self.timings.dismiss_delay) {
                        self.input.left_click()?;
                        self.control.smart_sleep(self.timings.after_dismiss);
                    }
                }
            }
        }
        Ok(())
    }

    /// Pause from inside the worker with a user-visible reason
    pub fn pause_with_reason(&mut self, reason: &str) {
        self.control.pause();
        self.enter_paused();
        self.events.status(reason);
    }

    fn enter_paused(&mut self) {
        self.pause_observed = true;
        self.transition(FishingState::FindingPrompt);
        let released = self.input.ensure_released();
        self.events.log(format!(
            "paused, state reset{}",
            if released { ", button released" } else { "" }
        ));
    }

    fn apply_pending_preset(&mut self) {
        let Some(name) = self.presets.take() else {
            return;
        };
        match self.config.select_preset(&name) {
            Ok(()) => self.events.log(format!("preset '{}' loaded", name)),
            Err(e) => self.events.log(format!("failed to load preset '{}': {}", name, e)),
        }
    }

    fn prompt_visible(&self, region: Region) -> Result<Option<&'static str>> {
        for key in CAST_PROMPTS {
            if self.vision.find(key, Some(region), PROMPT_THRESHOLD)?.found {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }

    /// Look for either prompt on the whole screen, then for a readable bait count
    fn environment_check(&mut self) {
        self.events.log("checking game environment");
        let mut ok = false;
        for key in CAST_PROMPTS {
            match self.vision.find(key, None, PROMPT_THRESHOLD) {
                Ok(m) if m.found => {
                    ok = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("[FISH] environment check: {}", e),
            }
        }
        if !ok {
            ok = self
                .region("bait_count")
                .ok()
                .and_then(|r| self.vision.read_digits(r).ok().flatten())
                .is_some();
        }

        if ok {
            self.events.log("environment check passed");
        } else {
            tracing::warn!("[FISH] game UI not detected, is the game in the foreground?");
            self.events.log("game UI not detected, make sure the game is in the foreground");
            self.events.status("environment check failed");
        }
    }

    /// Find the prompt, cast, and verify the line went out
    fn cast_rod(&mut self) -> Result<bool> {
        self.events.status("casting");
        self.events.log("looking for cast prompt");

        let cast_region = self.region("cast_rod")?;
        let deadline = Instant::now() + self.timings.cast_prompt_timeout;

        while Instant::now() < deadline {
            if !self.control.should_continue() {
                return Ok(false);
            }
            if let Some(key) = self.prompt_visible(cast_region)? {
                self.events.log("cast prompt found, casting");
                let control = Arc::clone(&self.control);
                let cast_time = secs(self.preset().cast_time);
                if !self.input.hold_while(cast_time, || control.should_continue())? {
                    return Ok(false);
                }
                if !self.control.smart_sleep(self.timings.post_cast_settle) {
                    return Ok(false);
                }
                return self.verify_cast(key, cast_region);
            }
            if !self.control.smart_sleep(self.timings.poll) {
                return Ok(false);
            }
        }

        self.events.log("cast prompt not found before timeout");
        Ok(false)
    }

    /// The prompt must leave the cast slot and show up in the wait slot
    fn verify_cast(&mut self, key: &str, cast_region: Region) -> Result<bool> {
        let wait_region = self.region("wait_bite")?;
        let deadline = Instant::now() + self.timings.verify_window;

        while Instant::now() < deadline {
            if !self.control.should_continue() {
                return Ok(false);
            }
            let cast_gone = !self.vision.find(key, Some(cast_region), PROMPT_THRESHOLD)?.found;
            if cast_gone && self.vision.find(key, Some(wait_region), PROMPT_THRESHOLD)?.found {
                self.events.log("line is out, waiting for a bite");
                return Ok(true);
            }
            if !self.control.smart_sleep(self.timings.poll) {
                return Ok(false);
            }
        }

        let bait = self.vision.read_digits(self.region("bait_count")?)?;
        if bait == Some(0) {
            self.events.log("cast did not register and bait count is 0");
            self.pause_with_reason(REASON_OUT_OF_BAIT);
        } else {
            self.events.log("cast did not register, the fish bucket may be full");
            self.pause_with_reason(REASON_INVENTORY_FULL);
        }
        Ok(false)
    }

    /// A drop in the bait counter means something bit
    fn wait_for_bite(&mut self) -> Result<bool> {
        self.events.status("waiting for bite");
        self.events.log("waiting for bait count to drop");

        let bait_region = self.region("bait_count")?;
        let mut baseline = None;
        for _ in 0..self.timings.baseline_attempts {
            if !self.control.should_continue() {
                return Ok(false);
            }
            baseline = self.vision.read_digits(bait_region)?;
            if baseline.is_some() {
                break;
            }
            if !self.control.smart_sleep(self.timings.baseline_retry) {
                return Ok(false);
            }
        }

        let Some(baseline) = baseline else {
            self.events.log("could not read the initial bait count, restarting cycle");
            return Ok(false);
        };
        tracing::debug!("[FISH] bait baseline {}", baseline);

        let deadline = Instant::now() + self.timings.bite_timeout;
        while Instant::now() < deadline {
            if !self.control.should_continue() {
                return Ok(false);
            }
            if let Some(current) = self.vision.read_digits(bait_region)? {
                if current < baseline {
                    self.events.log(format!("bait count {} -> {}, fish on", baseline, current));
                    return Ok(true);
                }
            }
            if !self.control.smart_sleep(self.timings.bite_poll) {
                return Ok(false);
            }
        }

        self.events.log("no bite before timeout");
        Ok(false)
    }

    /// Pull/release until the star shows, the fish escapes or pulls run out
    fn reel_in(&mut self) -> Result<ReelOutcome> {
        self.events.status("fish on, reeling");
        self.events.log("starting pull/release loop");

        let star_region = self.region("reel_in_star")?;
        let cast_region = self.region("cast_rod")?;
        let preset = self.preset().clone();

        for pull in 1..=preset.max_pulls {
            if !self.control.should_continue() {
                return Ok(ReelOutcome::Interrupted);
            }

            self.events.log(format!("pull {}/{}", pull, preset.max_pulls));
            let control = Arc::clone(&self.control);
            if !self
                .input
                .hold_while(secs(preset.reel_in_time), || control.should_continue())?
            {
                return Ok(ReelOutcome::Interrupted);
            }

            let slack = self.input.jittered(secs(preset.release_time));
            if !self.control.smart_sleep(slack) {
                return Ok(ReelOutcome::Interrupted);
            }

            if self.prompt_visible(cast_region)?.is_some() {
                self.events.log("cast prompt is back while reeling, the fish escaped");
                self.events.status("fish escaped");
                self.events.escaped();
                return Ok(ReelOutcome::Escaped);
            }

            if self.vision.find("star_grayscale", Some(star_region), STAR_THRESHOLD)?.found {
                self.events.log("star found, fish landed");
                return Ok(ReelOutcome::Landed);
            }
        }

        self.events.log("max pulls reached without the star");
        Ok(ReelOutcome::Exhausted)
    }

    /// OCR the catch banner and emit a record
    fn record_catch(&mut self) -> Result<()> {
        self.events.status("recording catch");
        self.events.log("reading catch banner");

        if !self.control.smart_sleep(self.timings.record_settle) {
            return Ok(());
        }

        let collect_region = self.region("shangyu")?;
        match self
            .vision
            .find("shangyu_grayscale", Some(collect_region), COLLECT_THRESHOLD)
        {
            Ok(m) if m.found => self.events.log("collect button visible, catch confirmed"),
            Ok(_) => {}
            Err(e) => tracing::debug!("[FISH] collect button check skipped: {}", e),
        }

        let banner = self.vision.capture(Some(self.region("ocr_area")?))?;
        let fragments = match self.recognizer.recognize(&banner) {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!("[FISH] text recognition failed: {}", e);
                Vec::new()
            }
        };

        if fragments.is_empty() {
            self.events.log("no usable text in the catch banner");
            self.save_image(&banner, "debug_screenshots", "ocr_failed");
            return Ok(());
        }

        let text = fragments.concat();
        self.events.log(format!("recognized text: {}", text));

        let record = match catch_parser::parse(&text) {
            Ok(record) => record,
            Err(e) => {
                self.events.log(format!("could not parse catch: {}", e));
                return Ok(());
            }
        };

        self.events.log(format!(
            "caught {}, {}kg, quality {}{}",
            record.name,
            record.weight,
            record.quality,
            if record.is_new_record { ", new record" } else { "" }
        ));

        if record.quality == Quality::Legendary {
            self.events.log("legendary catch, saving screenshot");
            match self.vision.capture(None) {
                Ok(screen) => {
                    let prefix = format!("legendary_{}", record.name.replace([':', '/', '\\'], "_"));
                    self.save_image(&screen, "screenshots", &prefix);
                }
                Err(e) => self.events.log(format!("screenshot failed: {}", e)),
            }
        }

        self.events.record(record);
        Ok(())
    }

    /// Save under `<data_dir>/<folder>/<prefix>_<timestamp>.png`, logging the outcome
    fn save_image(&self, image: &RgbaImage, folder: &str, prefix: &str) {
        let dir = self.data_dir.join(folder);
        let path = dir.join(format!("{}_{}.png", prefix, Local::now().format("%Y%m%d_%H%M%S")));
        let result = fs::create_dir_all(&dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| image.save(&path).map_err(anyhow::Error::from));
        match result {
            Ok(()) => self.events.log(format!("saved {}", path.display())),
            Err(e) => self.events.log(format!("failed to save {}: {}", path.display(), e)),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: FishingState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PRESET;
    use crate::events::CoreEvent;
    use crate::testing::{ActionLog, FixedRecognizer, InputAction, RecordingBackend, ScriptedVision};
    use std::sync::mpsc::Receiver;

    fn fast_timings() -> CycleTimings {
        CycleTimings {
            cast_prompt_timeout: Duration::from_millis(200),
            post_cast_settle: Duration::from_millis(10),
            verify_window: Duration::from_millis(100),
            poll: Duration::from_millis(10),
            baseline_attempts: 3,
            baseline_retry: Duration::from_millis(10),
            bite_timeout: Duration::from_millis(150),
            bite_poll: Duration::from_millis(10),
            record_settle: Duration::from_millis(10),
            dismiss_delay: Duration::from_millis(10),
            after_dismiss: Duration::from_millis(10),
        }
    }

    fn fast_config(reel_in_time: f64) -> Config {
        let mut config = Config::default();
        let preset = config.presets.get_mut(DEFAULT_PRESET).unwrap();
        preset.cast_time = 0.02;
        preset.reel_in_time = reel_in_time;
        preset.release_time = 0.02;
        preset.max_pulls = 3;
        preset.cycle_interval = 0.01;
        config.current_preset = DEFAULT_PRESET.to_string();
        config
    }

    struct Harness {
        worker: FishingWorker,
        actions: ActionLog,
        events: Receiver<CoreEvent>,
        _dir: tempfile::TempDir,
    }

    fn harness(vision: ScriptedVision, text: &[&str], reel_in_time: f64) -> Harness {
        let (backend, actions) = RecordingBackend::new();
        let (sink, events) = EventSink::channel();
        let dir = tempfile::tempdir().unwrap();
        let control = Arc::new(RunControl::new());
        control.start();
        control.resume();

        let worker = FishingWorker::new(
            Perception {
                vision: Arc::new(vision),
                recognizer: Box::new(FixedRecognizer::new(text)),
                mapper: RegionMapper::new(2560, 1440),
            },
            InputSimulator::new(Box::new(backend), 0),
            fast_config(reel_in_time),
            control,
            Arc::new(PresetRequest::new()),
            sink,
        )
        .with_timings(fast_timings())
        .with_data_dir(dir.path().to_path_buf());

        Harness {
            worker,
            actions,
            events,
            _dir: dir,
        }
    }

    fn region(name: &str) -> Region {
        RegionMapper::new(2560, 1440).resolve(name).unwrap()
    }

    #[test]
    fn test_bite_timeout_returns_to_finding_prompt() {
        let vision = ScriptedVision::new().with_digits([Some(5)]);
        let mut h = harness(vision, &[], 0.02);
        h.worker.set_state(FishingState::WaitingForBite);

        h.worker.step().unwrap();

        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        assert!(!h
            .events
            .try_iter()
            .any(|e| e == CoreEvent::Status("fish on, reeling".into())));
    }

    #[test]
    fn test_bait_drop_moves_to_reeling() {
        let vision = ScriptedVision::new().with_digits([Some(12), Some(12), Some(11)]);
        let mut h = harness(vision, &[], 0.02);
        h.worker.set_state(FishingState::WaitingForBite);

        h.worker.step().unwrap();
        assert_eq!(h.worker.state(), FishingState::ReelingIn);
    }

    #[test]
    fn test_no_baseline_aborts_cycle() {
        let vision = ScriptedVision::new().with_digits([None]);
        let mut h = harness(vision, &[], 0.02);
        h.worker.set_state(FishingState::WaitingForBite);

        h.worker.step().unwrap();
        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        assert!(h.worker.control().should_continue());
    }

    #[test]
    fn test_cast_success() {
        let cast = region("cast_rod");
        let wait = region("wait_bite");
        let casts = std::sync::atomic::AtomicUsize::new(0);
        // prompt sits in the cast slot until the first verification poll
        let vision = ScriptedVision::new().with_finder(move |name, r| {
            if name != "F1_grayscale" {
                return false;
            }
            if r == Some(cast) {
                casts.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0
            } else {
                r == Some(wait)
            }
        });
        let mut h = harness(vision, &[], 0.02);

        h.worker.step().unwrap();

        assert_eq!(h.worker.state(), FishingState::WaitingForBite);
        assert_eq!(h.actions.actions(), vec![InputAction::Down, InputAction::Up]);
    }

    #[test]
    fn test_cast_failure_with_empty_bait_pauses() {
        let cast = region("cast_rod");
        let vision = ScriptedVision::new()
            .with_finder(move |name, r| name == "F2_grayscale" && r == Some(cast))
            .with_digits([Some(0)]);
        let mut h = harness(vision, &[], 0.02);

        h.worker.step().unwrap();

        assert!(h.worker.control().is_paused());
        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events.contains(&CoreEvent::Status(REASON_OUT_OF_BAIT.into())));
    }

    #[test]
    fn test_cast_failure_with_bait_left_reports_full_bucket() {
        let cast = region("cast_rod");
        let vision = ScriptedVision::new()
            .with_finder(move |name, r| name == "F1_grayscale" && r == Some(cast))
            .with_digits([Some(7)]);
        let mut h = harness(vision, &[], 0.02);

        h.worker.step().unwrap();

        assert!(h.worker.control().is_paused());
        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events.contains(&CoreEvent::Status(REASON_INVENTORY_FULL.into())));
    }

    #[test]
    fn test_escape_detected_while_reeling() {
        let cast = region("cast_rod");
        let vision = ScriptedVision::new().with_finder(move |name, r| name == "F1_grayscale" && r == Some(cast));
        let mut h = harness(vision, &[], 0.02);
        h.worker.set_state(FishingState::ReelingIn);

        h.worker.step().unwrap();

        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events.contains(&CoreEvent::Escaped));
        assert!(!events.iter().any(|e| matches!(e, CoreEvent::Record(_))));
        assert_eq!(h.actions.actions(), vec![InputAction::Down, InputAction::Up]);
    }

    #[test]
    fn test_landed_catch_is_recorded_and_dismissed() {
        let star = region("reel_in_star");
        let vision = ScriptedVision::new().with_finder(move |name, r| name == "star_grayscale" && r == Some(star));
        let mut h = harness(vision, &["你钓到了 金鱼", "稀有 1.250千克"], 0.02);
        h.worker.set_state(FishingState::ReelingIn);

        h.worker.step().unwrap();

        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        let records: Vec<_> = h
            .events
            .try_iter()
            .filter_map(|e| match e {
                CoreEvent::Record(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "金鱼");
        assert_eq!(records[0].quality, Quality::Rare);
        // one pull, then the dismiss click
        assert_eq!(
            h.actions.actions(),
            vec![
                InputAction::Down,
                InputAction::Up,
                InputAction::Down,
                InputAction::Up
            ]
        );
    }

    #[test]
    fn test_pulls_exhausted() {
        let mut h = harness(ScriptedVision::new(), &[], 0.02);
        h.worker.set_state(FishingState::ReelingIn);

        h.worker.step().unwrap();

        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        // max_pulls = 3
        assert_eq!(h.actions.actions().len(), 6);
    }

    #[test]
    fn test_empty_ocr_saves_debug_crop() {
        let star = region("reel_in_star");
        let vision = ScriptedVision::new().with_finder(move |name, r| name == "star_grayscale" && r == Some(star));
        let mut h = harness(vision, &[], 0.02);
        h.worker.set_state(FishingState::ReelingIn);

        h.worker.step().unwrap();

        let debug_dir = h._dir.path().join("debug_screenshots");
        let saved: Vec<_> = fs::read_dir(debug_dir).unwrap().flatten().collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].file_name().to_string_lossy().starts_with("ocr_failed_"));
    }

    #[test]
    fn test_pause_mid_hold_releases_button() {
        let mut h = harness(ScriptedVision::new(), &[], 10.0);
        h.worker.set_state(FishingState::ReelingIn);
        let control = h.worker.control();

        let pauser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            control.pause();
        });

        let start = Instant::now();
        h.worker.step().unwrap();
        pauser.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(h.worker.state(), FishingState::FindingPrompt);
        assert_eq!(h.actions.actions(), vec![InputAction::Down, InputAction::Up]);
    }

    #[test]
    fn test_vision_error_pauses_with_reason() {
        let mut h = harness(ScriptedVision::failing(), &[], 0.02);

        h.worker.guarded_step();

        assert!(h.worker.control().is_paused());
        assert!(h.worker.control().is_running());
        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::Status(s) if s.starts_with("error:"))));
    }

    #[test]
    fn test_pending_preset_applied() {
        let mut h = harness(ScriptedVision::new(), &[], 0.02);
        h.worker.presets.request("冰钓重杆");
        h.worker.apply_pending_preset();
        assert_eq!(h.worker.config.current_preset, "冰钓重杆");
        assert_eq!(h.worker.preset().max_pulls, 18);

        h.worker.presets.request("missing");
        h.worker.apply_pending_preset();
        assert_eq!(h.worker.config.current_preset, "冰钓重杆");
    }

    #[test]
    fn test_secs_clamps_config_values() {
        assert_eq!(secs(0.5), Duration::from_millis(500));
        assert_eq!(secs(-3.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(1e20), MAX_WAIT);
        assert_eq!(secs(f64::INFINITY), MAX_WAIT);
    }

    #[test]
    fn test_huge_cycle_interval_still_stops() {
        let mut h = harness(ScriptedVision::new(), &[], 0.02);
        let preset = h.worker.config.presets.get_mut(DEFAULT_PRESET).unwrap();
        preset.cycle_interval = 1e20;
        assert!(h.worker.config.validate().is_ok());
        let control = h.worker.control();

        let worker = h.worker;
        let handle = thread::spawn(move || worker.run());
        // long enough for one cast attempt to time out and the interval sleep to begin
        thread::sleep(Duration::from_millis(400));
        control.stop();
        let start = Instant::now();
        assert!(handle.join().is_ok());
        assert!(start.elapsed() < Duration::from_secs(1));

        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events.contains(&CoreEvent::Log("automation loop stopped".into())));
        assert!(!events
            .iter()
            .any(|e| matches!(e, CoreEvent::Status(s) if s.starts_with("panic:"))));
    }

    #[test]
    fn test_run_exits_on_stop() {
        let h = harness(ScriptedVision::new(), &[], 0.02);
        let control = h.worker.control();
        control.pause();

        let worker = h.worker;
        let handle = thread::spawn(move || worker.run());
        thread::sleep(Duration::from_millis(150));
        control.stop();
        handle.join().unwrap();

        let events: Vec<_> = h.events.try_iter().collect();
        assert!(events.contains(&CoreEvent::Status("environment check failed".into())));
        assert!(events.contains(&CoreEvent::Log("automation loop stopped".into())));
    }
}
