//! Mouse input simulation with a held-button guard and timing jitter
//!
//! Each worker owns its own [`InputSimulator`]. The simulator tracks whether it
//! has the left button down and never issues a second press while it does;
//! [`InputSimulator::ensure_released`] is idempotent and also runs on drop.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;

/// Shortest duration a jittered action is allowed to take
pub const MIN_JITTERED: Duration = Duration::from_millis(10);

/// How often a hold checks whether it should keep going
pub const HOLD_POLL: Duration = Duration::from_millis(50);

const CLICK_PRESS_MS: std::ops::RangeInclusive<u64> = 50..=120;
const LEFT_CLICK_PRESS: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input backend failed: {0}")]
    Backend(String),
    #[error("input simulation is not supported on this platform")]
    Unsupported,
}

/// Raw OS-level mouse operations
pub trait InputBackend: Send {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError>;
    fn button_down(&mut self) -> Result<(), InputError>;
    fn button_up(&mut self) -> Result<(), InputError>;
}

#[cfg(windows)]
mod platform {
    use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

    use super::{InputBackend, InputError};

    pub struct EnigoBackend {
        enigo: Enigo,
    }

    impl EnigoBackend {
        pub fn new() -> Result<Self, InputError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| InputError::Backend(format!("{:?}", e)))?;
            Ok(Self { enigo })
        }
    }

    impl InputBackend for EnigoBackend {
        fn move_to(&mut self, x: i32, y: i32) -> Result<(), InputError> {
            self.enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| InputError::Backend(format!("move to ({}, {}): {:?}", x, y, e)))
        }

        fn button_down(&mut self) -> Result<(), InputError> {
            self.enigo
                .button(Button::Left, Direction::Press)
                .map_err(|e| InputError::Backend(format!("press: {:?}", e)))
        }

        fn button_up(&mut self) -> Result<(), InputError> {
            self.enigo
                .button(Button::Left, Direction::Release)
                .map_err(|e| InputError::Backend(format!("release: {:?}", e)))
        }
    }

    pub fn backend() -> Result<Box<dyn InputBackend>, InputError> {
        Ok(Box::new(EnigoBackend::new()?))
    }
}

#[cfg(not(windows))]
mod platform {
    use super::{InputBackend, InputError};

    pub struct UnsupportedBackend;

    impl InputBackend for UnsupportedBackend {
        fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), InputError> {
            tracing::warn!("mouse_move not implemented on this platform");
            Err(InputError::Unsupported)
        }

        fn button_down(&mut self) -> Result<(), InputError> {
            tracing::warn!("mouse_press not implemented on this platform");
            Err(InputError::Unsupported)
        }

        fn button_up(&mut self) -> Result<(), InputError> {
            tracing::warn!("mouse_release not implemented on this platform");
            Err(InputError::Unsupported)
        }
    }

    pub fn backend() -> Result<Box<dyn InputBackend>, InputError> {
        Ok(Box::new(UnsupportedBackend))
    }
}

/// Backend for the current platform
pub fn platform_backend() -> Result<Box<dyn InputBackend>, InputError> {
    platform::backend()
}

/// Send a bare button release through a fresh backend.
///
/// Used by the controller after the workers are gone, regardless of what
/// state their simulators were left in.
pub fn force_release_button() {
    match platform_backend().and_then(|mut backend| backend.button_up()) {
        Ok(()) => tracing::debug!("[INPUT] forced button release"),
        Err(e) => tracing::warn!("[INPUT] forced button release failed: {}", e),
    }
}

/// Apply `±range`% uniform jitter to `base`.
///
/// `range == 0` returns `base` untouched. Otherwise the result is rounded to
/// whole milliseconds and never shorter than [`MIN_JITTERED`].
pub fn jitter<R: Rng + ?Sized>(base: Duration, range: u8, rng: &mut R) -> Duration {
    if range == 0 {
        return base;
    }
    let spread = f64::from(range.min(100)) / 100.0;
    let factor = rng.random_range((1.0 - spread)..=(1.0 + spread));
    let millis = (base.as_secs_f64() * factor * 1000.0).round().max(0.0) as u64;
    Duration::from_millis(millis).max(MIN_JITTERED)
}

/// Per-worker mouse driver
pub struct InputSimulator {
    backend: Box<dyn InputBackend>,
    button_held: bool,
    jitter_range: u8,
}

impl InputSimulator {
    pub fn new(backend: Box<dyn InputBackend>, jitter_range: u8) -> Self {
        Self {
            backend,
            button_held: false,
            jitter_range,
        }
    }

    /// Simulator on the platform backend
    pub fn platform(jitter_range: u8) -> Result<Self, InputError> {
        Ok(Self::new(platform_backend()?, jitter_range))
    }

    pub fn is_button_held(&self) -> bool {
        self.button_held
    }

    /// Jitter `base` with this simulator's configured range
    pub fn jittered(&self, base: Duration) -> Duration {
        jitter(base, self.jitter_range, &mut rand::rng())
    }

    /// Move to `(x, y)` and click with a short randomized press
    pub fn click(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        tracing::debug!("[INPUT] click at ({}, {})", x, y);
        self.backend.move_to(x, y)?;
        let press = Duration::from_millis(rand::rng().random_range(CLICK_PRESS_MS));
        self.press_down()?;
        thread::sleep(press);
        self.release_up()
    }

    /// Click wherever the cursor currently is
    pub fn left_click(&mut self) -> Result<(), InputError> {
        self.press_down()?;
        thread::sleep(LEFT_CLICK_PRESS);
        self.release_up()
    }

    pub fn press_down(&mut self) -> Result<(), InputError> {
        if self.button_held {
            tracing::warn!("[INPUT] press_down while the button is already held, ignoring");
            return Ok(());
        }
        self.backend.button_down()?;
        self.button_held = true;
        Ok(())
    }

    pub fn release_up(&mut self) -> Result<(), InputError> {
        let result = self.backend.button_up();
        self.button_held = false;
        result
    }

    /// Release the button if this simulator holds it.
    ///
    /// Returns whether a release was sent. Backend failures are logged, the
    /// held flag is cleared either way.
    pub fn ensure_released(&mut self) -> bool {
        if !self.button_held {
            return false;
        }
        if let Err(e) = self.backend.button_up() {
            tracing::warn!("[INPUT] release on cleanup failed: {}", e);
        }
        self.button_held = false;
        true
    }

    /// Hold the button for a jittered `duration`, uninterruptible
    pub fn hold(&mut self, duration: Duration) -> Result<(), InputError> {
        self.hold_while(duration, || true).map(|_| ())
    }

    /// Hold the button for a jittered `duration` while `keep_holding` says so.
    ///
    /// Returns `Ok(true)` when the whole duration elapsed and `Ok(false)` when
    /// `keep_holding` cut it short. The button is released on every exit,
    /// including unwinding out of `keep_holding`.
    pub fn hold_while<F>(&mut self, duration: Duration, mut keep_holding: F) -> Result<bool, InputError>
    where
        F: FnMut() -> bool,
    {
        let duration = self.jittered(duration);
        tracing::trace!("[INPUT] hold for {:?}", duration);

        self.press_down()?;
        let guard = HeldButton { input: self };
        let start = Instant::now();
        let completed = loop {
            if !keep_holding() {
                break false;
            }
            let remaining = duration.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break true;
            }
            thread::sleep(remaining.min(HOLD_POLL));
        };
        guard.input.release_up()?;
        Ok(completed)
    }
}

impl Drop for InputSimulator {
    fn drop(&mut self) {
        if self.ensure_released() {
            tracing::debug!("[INPUT] released held button on drop");
        }
    }
}

/// Releases the button when dropped
struct HeldButton<'a> {
    input: &'a mut InputSimulator,
}

impl Drop for HeldButton<'_> {
    fn drop(&mut self) {
        self.input.ensure_released();
    }
}
