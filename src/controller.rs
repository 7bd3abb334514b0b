//! Owns the two worker threads and relays control signals to them

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::events::EventSink;
use crate::fishing::{FishingWorker, PopupWorker};
use crate::input::force_release_button;
use crate::utils::{PresetRequest, RunControl};

const JOIN_POLL: Duration = Duration::from_millis(20);

struct WorkerHandle {
    name: &'static str,
    control: Arc<RunControl>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    fn spawn<F>(name: &'static str, control: Arc<RunControl>, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = thread::Builder::new().name(name.to_string()).spawn(body)?;
        tracing::info!("[CTRL] {} thread started", name);
        Ok(Self {
            name,
            control,
            thread: Some(thread),
        })
    }

    fn is_finished(&self) -> bool {
        self.thread.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("[CTRL] {} thread panicked", self.name);
            }
        }
    }
}

/// Control surface over the automation loop and the popup handler
pub struct Controller {
    fishing: WorkerHandle,
    popup: WorkerHandle,
    presets: Arc<PresetRequest>,
    events: EventSink,
}

impl Controller {
    /// Start both workers. The automation loop comes up paused.
    pub fn spawn(
        fishing: FishingWorker,
        popup: PopupWorker,
        presets: Arc<PresetRequest>,
        events: EventSink,
    ) -> io::Result<Self> {
        let fishing_control = fishing.control();
        fishing_control.pause();
        fishing_control.start();
        let popup_control = popup.control();
        popup_control.start();

        let fishing = WorkerHandle::spawn("fishing", fishing_control, move || fishing.run())?;
        let popup = WorkerHandle::spawn("popup", popup_control, move || popup.run())?;
        Ok(Self {
            fishing,
            popup,
            presets,
            events,
        })
    }

    pub fn is_paused(&self) -> bool {
        self.fishing.control.is_paused()
    }

    fn fishing_alive(&self) -> bool {
        if self.fishing.control.is_running() {
            return true;
        }
        self.events.log("automation loop has been stopped, restart the program to fish again");
        false
    }

    /// Flip the automation loop between running and paused
    pub fn toggle(&self) {
        if !self.fishing_alive() {
            return;
        }
        let paused = self.fishing.control.toggle();
        self.events.status(if paused { "paused" } else { "running" });
    }

    pub fn pause(&self) {
        self.fishing.control.pause();
        self.events.status("paused");
    }

    pub fn resume(&self) {
        if !self.fishing_alive() {
            return;
        }
        self.fishing.control.resume();
        self.events.status("running");
    }

    /// End the automation loop; the popup handler keeps going
    pub fn stop(&self) {
        self.fishing.control.stop();
        self.events.status("stopped");
    }

    /// Hand a preset over to the automation loop and pause it.
    ///
    /// The loop applies the preset at its next safe point; resume afterwards.
    pub fn set_preset(&self, name: &str) {
        self.presets.request(name);
        self.pause();
        self.events.log(format!("preset '{}' requested, resume to apply", name));
    }

    /// Stop both workers and wait up to `grace` for them to exit.
    ///
    /// The simulated button is released regardless of how the threads end.
    pub fn shutdown(mut self, grace: Duration) {
        self.fishing.control.stop();
        self.popup.control.stop();

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline && !(self.fishing.is_finished() && self.popup.is_finished()) {
            thread::sleep(JOIN_POLL);
        }

        for worker in [&mut self.fishing, &mut self.popup] {
            if worker.is_finished() {
                worker.join();
            } else {
                tracing::warn!("[CTRL] {} thread did not stop within {:?}, detaching", worker.name, grace);
                worker.thread.take();
            }
        }

        force_release_button();
        tracing::info!("[CTRL] shutdown complete");
    }
}
