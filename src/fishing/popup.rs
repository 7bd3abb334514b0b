//! Background handler for the time-extension popup

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::events::EventSink;
use crate::input::InputSimulator;
use crate::screen_reader::{RegionMapper, Vision};
use crate::utils::run_control::SLEEP_SLICE;
use crate::utils::RunControl;

pub const POPUP_TEMPLATE: &str = "chang_grayscale";
pub const POPUP_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct PopupTimings {
    pub poll: Duration,
    pub after_click: Duration,
}

impl Default for PopupTimings {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(500),
            after_click: Duration::from_secs(1),
        }
    }
}

/// Which button was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupChoice {
    Accept,
    Decline,
}

impl PopupChoice {
    fn point_name(self) -> &'static str {
        match self {
            PopupChoice::Accept => "btn_jiashi_yes",
            PopupChoice::Decline => "btn_jiashi_no",
        }
    }
}

pub struct PopupWorker {
    vision: Arc<dyn Vision>,
    mapper: RegionMapper,
    input: InputSimulator,
    accept: bool,
    control: Arc<RunControl>,
    events: EventSink,
    timings: PopupTimings,
}

impl PopupWorker {
    /// `accept` picks "yes" over "no" when the popup shows up
    pub fn new(
        vision: Arc<dyn Vision>,
        mapper: RegionMapper,
        input: InputSimulator,
        accept: bool,
        control: Arc<RunControl>,
        events: EventSink,
    ) -> Self {
        Self {
            vision,
            mapper,
            input,
            accept,
            control,
            events,
            timings: PopupTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: PopupTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Check once and answer the popup if it is showing
    pub fn poll_once(&mut self) -> Result<Option<PopupChoice>> {
        let region = self.mapper.resolve("jiashi_popup")?;
        if !self.vision.find(POPUP_TEMPLATE, Some(region), POPUP_THRESHOLD)?.found {
            return Ok(None);
        }

        self.events.popup_log("extension popup detected");
        let choice = if self.accept {
            PopupChoice::Accept
        } else {
            PopupChoice::Decline
        };
        let (x, y) = self.mapper.resolve_point(choice.point_name())?;
        self.input.click(x, y)?;
        self.events.popup_log(match choice {
            PopupChoice::Accept => "clicked 'yes'",
            PopupChoice::Decline => "clicked 'no'",
        });
        Ok(Some(choice))
    }

    /// Thread body; returns once the control is stopped.
    ///
    /// The control must already be started. The handler never pauses itself.
    pub fn run(mut self) {
        self.control.resume();
        self.events.popup_log("popup handler started");

        while self.control.is_running() {
            if self.control.is_paused() {
                thread::sleep(SLEEP_SLICE);
                continue;
            }
            match self.poll_once() {
                Ok(Some(_)) => {
                    self.control.smart_sleep(self.timings.after_click);
                }
                Ok(None) => {}
                Err(e) => self.events.popup_log(format!("popup handler error: {:#}", e)),
            }
            self.control.smart_sleep(self.timings.poll);
        }

        self.input.ensure_released();
        self.events.popup_log("popup handler stopped");
    }
}
