//! Auto Angler - automated fishing for Blue Protocol: Star Resonance
//!
//! Console front end: loads the configuration, starts the automation loop
//! (paused) and the popup handler, then relays hotkeys and console commands
//! until `quit`.

use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use global_hotkey::{hotkey::HotKey, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use auto_angler::config::Config;
use auto_angler::console::{CommandError, ControlCommand, HELP};
use auto_angler::controller::Controller;
use auto_angler::events::{CoreEvent, EventSink};
use auto_angler::fishing::{FishingWorker, Perception, PopupWorker, Quality};
use auto_angler::input::InputSimulator;
use auto_angler::screen_reader::region::{REFERENCE_HEIGHT, REFERENCE_WIDTH};
use auto_angler::screen_reader::{RegionMapper, ScreenService, TemplateMatcher, TesseractRecognizer, Vision};
use auto_angler::utils::keybinds::parse_hotkey;
use auto_angler::utils::path::{get_data_dir, resources_dir};
use auto_angler::utils::{PresetRequest, RunControl};

const LOOP_INTERVAL: Duration = Duration::from_millis(20);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Session statistics
#[derive(Debug, Default)]
struct SessionStats {
    catches: u32,
    escapes: u32,
    legendary: u32,
    new_records: u32,
}

impl SessionStats {
    fn observe(&mut self, event: &CoreEvent) {
        match event {
            CoreEvent::Record(record) => {
                self.catches += 1;
                if record.quality == Quality::Legendary {
                    self.legendary += 1;
                }
                if record.is_new_record {
                    self.new_records += 1;
                }
                println!("caught {}", record);
            }
            CoreEvent::Escaped => self.escapes += 1,
            CoreEvent::Status(status) => println!("status: {}", status),
            CoreEvent::Log(_) | CoreEvent::PopupLog(_) => {}
        }
    }
}

fn init_logging(base: &Path) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    const LOG_FILTER: &str = "info,auto_angler=info";

    let log_dir = base.join("debug").join("log");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join("debug.log");
    let file_result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            let stdout_layer = tracing_subscriber::fmt::layer();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            eprintln!("[INIT] Failed to create debug log file at {:?}: {}", log_file_path, e);
        }
    }
}

/// Register a hotkey, logging instead of failing
fn register_hotkey(manager: Option<&GlobalHotKeyManager>, label: &str, text: &str) -> Option<HotKey> {
    let manager = manager?;
    let hotkey = match parse_hotkey(text) {
        Ok(hotkey) => hotkey,
        Err(e) => {
            tracing::error!("[INIT] Invalid {} hotkey '{}': {}", label, text, e);
            return None;
        }
    };
    if let Err(e) = manager.register(hotkey) {
        tracing::warn!("[INIT] Failed to register {} hotkey '{}': {}", label, text, e);
        return None;
    }
    tracing::info!("[INIT] {} hotkey: {}", label, text);
    Some(hotkey)
}

fn spawn_console_reader(tx: Sender<Result<ControlCommand, CommandError>>) {
    let spawned = thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(ControlCommand::parse(&line)).is_err() {
                    break;
                }
            }
            tracing::debug!("[INIT] console input closed");
        });
    if let Err(e) = spawned {
        tracing::warn!("[INIT] Console commands unavailable: {}", e);
    }
}

#[cfg(windows)]
fn pump_messages() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_messages() {}

fn log_regions(mapper: &RegionMapper) {
    let (w, h) = mapper.screen_size();
    tracing::info!("[DEBUG] regions at {}x{} (scale {:.3})", w, h, mapper.scale());
    for line in mapper.describe_all() {
        tracing::info!("[DEBUG] {}", line);
    }
}

fn main() {
    let base = get_data_dir();
    init_logging(&base);

    println!("Auto Angler {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let config = Config::load_or_default(&Config::default_path());
    let settings = config.global_settings.clone();
    println!("Preset: {}", config.current_preset);

    let (width, height) = ScreenService::primary_screen_size().unwrap_or_else(|| {
        tracing::warn!("[INIT] Could not detect the screen size, assuming the reference layout");
        (REFERENCE_WIDTH as u32, REFERENCE_HEIGHT as u32)
    });
    let mapper = RegionMapper::new(width, height);
    tracing::info!("[INIT] screen {}x{}, scale {:.3}", width, height, mapper.scale());

    let matcher = TemplateMatcher::new(Arc::new(ScreenService::new()), resources_dir(), &mapper);
    match matcher.preload() {
        Ok(count) => println!("Templates loaded: {}", count),
        Err(e) => tracing::error!("[INIT] Failed to load templates: {}", e),
    }
    let vision: Arc<dyn Vision> = Arc::new(matcher);

    let fishing_input = match InputSimulator::platform(settings.jitter_range) {
        Ok(input) => input,
        Err(e) => {
            tracing::error!("[INIT] Input backend unavailable: {}", e);
            return;
        }
    };
    let popup_input = match InputSimulator::platform(settings.jitter_range) {
        Ok(input) => input,
        Err(e) => {
            tracing::error!("[INIT] Input backend unavailable: {}", e);
            return;
        }
    };

    let (events, event_rx): (EventSink, Receiver<CoreEvent>) = EventSink::channel();
    let presets = Arc::new(PresetRequest::new());

    let fishing = FishingWorker::new(
        Perception {
            vision: Arc::clone(&vision),
            recognizer: Box::new(TesseractRecognizer::new()),
            mapper,
        },
        fishing_input,
        config,
        Arc::new(RunControl::new()),
        Arc::clone(&presets),
        events.clone(),
    );
    let popup = PopupWorker::new(
        vision,
        mapper,
        popup_input,
        settings.enable_jiashi,
        Arc::new(RunControl::new()),
        events.clone(),
    );

    let controller = match Controller::spawn(fishing, popup, presets, events) {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!("[INIT] Failed to start workers: {}", e);
            return;
        }
    };

    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            tracing::error!("[INIT] Failed to create hotkey manager: {}", e);
            None
        }
    };
    let toggle_hotkey = register_hotkey(manager.as_ref(), "toggle", &settings.hotkey);
    let debug_hotkey = register_hotkey(manager.as_ref(), "debug", &settings.debug_hotkey);
    let hotkey_rx = GlobalHotKeyEvent::receiver();

    let (command_tx, command_rx) = mpsc::channel();
    spawn_console_reader(command_tx);

    println!("Hotkeys: TOGGLE={}, DEBUG={}", settings.hotkey, settings.debug_hotkey);
    println!("{}", HELP);
    println!("Paused. Press the toggle hotkey or type 'toggle' to start.");

    let mut stats = SessionStats::default();
    'main: loop {
        pump_messages();

        while let Ok(event) = hotkey_rx.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            if toggle_hotkey.is_some_and(|h| h.id() == event.id) {
                controller.toggle();
            } else if debug_hotkey.is_some_and(|h| h.id() == event.id) {
                log_regions(&mapper);
            }
        }

        while let Ok(command) = command_rx.try_recv() {
            match command {
                Ok(ControlCommand::Toggle) => controller.toggle(),
                Ok(ControlCommand::Pause) => controller.pause(),
                Ok(ControlCommand::Resume) => controller.resume(),
                Ok(ControlCommand::Stop) => controller.stop(),
                Ok(ControlCommand::Preset(name)) => controller.set_preset(&name),
                Ok(ControlCommand::Regions) => log_regions(&mapper),
                Ok(ControlCommand::Help) => println!("{}", HELP),
                Ok(ControlCommand::Quit) => break 'main,
                Err(CommandError::Empty) => {}
                Err(e) => println!("{}", e),
            }
        }

        for event in event_rx.try_iter() {
            stats.observe(&event);
        }

        thread::sleep(LOOP_INTERVAL);
    }

    println!("Shutting down...");
    controller.shutdown(SHUTDOWN_GRACE);
    for event in event_rx.try_iter() {
        stats.observe(&event);
    }

    println!("================================");
    println!(
        "Session: {} catches ({} legendary, {} new records), {} escaped",
        stats.catches, stats.legendary, stats.new_records, stats.escapes
    );
}
