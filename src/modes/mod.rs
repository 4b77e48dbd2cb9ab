//! Sync mode state machines
//!
//! Every mode follows the same shape: capture, generate one color frame per
//! device, send. The session worker drives a [`SyncMode`] by calling
//! [`SyncMode::tick`] until it is told to stop.

mod action;
mod edge;
mod monitor;
mod music;
mod zone;

pub use action::{ActionDetector, ActionState, ActionSync};
pub use edge::EdgeSync;
pub use monitor::MonitorSync;
pub use music::MusicSync;
pub use zone::ZoneSync;

use crate::capture::{CaptureBackend, ScreenCapture};
use crate::config::{BrightnessConfig, SyncConfig, SyncTiming};
use crate::error::LightError;
use crate::frame::Frame;
use crate::link::DeviceLink;
use crate::types::{DeviceDescriptor, Rgb, Rotation, SyncModeKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Frames between per-frame debug logs
const LOG_EVERY: u64 = 60;

/// Outcome of a single loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Frames went out; the next capture follows immediately
    Sent,

    /// Capture had nothing yet; the worker pauses before retrying
    Idle,
}

/// Failure of a single loop iteration
#[derive(Error, Debug)]
pub enum TickError {
    /// Logged; the loop backs off briefly and carries on
    #[error("{0}")]
    Recoverable(LightError),

    /// Ends the session
    #[error("{0}")]
    Fatal(LightError),
}

impl TickError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickError::Fatal(_))
    }
}

impl From<LightError> for TickError {
    fn from(err: LightError) -> Self {
        match err {
            LightError::UnsupportedBackend(_) => TickError::Fatal(err),
            other => TickError::Recoverable(other),
        }
    }
}

/// Parameters that can change while a session runs
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub rotation: Rotation,
    brightness: HashMap<SyncModeKind, f64>,
}

impl SessionParams {
    pub fn new(config: &BrightnessConfig, rotation: Rotation) -> Self {
        let mut brightness = HashMap::new();
        brightness.insert(SyncModeKind::Monitor, config.monitor.clamp(0.0, 1.0));
        brightness.insert(SyncModeKind::Music, config.music.clamp(0.0, 1.0));
        if let Some(ambient) = config.ambient {
            for kind in [SyncModeKind::Edge, SyncModeKind::Zone, SyncModeKind::Action] {
                brightness.insert(kind, ambient.clamp(0.0, 1.0));
            }
        }
        Self { rotation, brightness }
    }

    /// Brightness override for a mode, `None` when each device's own applies
    pub fn brightness(&self, mode: SyncModeKind) -> Option<f64> {
        self.brightness.get(&mode).copied()
    }

    pub fn set_brightness(&mut self, mode: SyncModeKind, value: f64) {
        self.brightness.insert(mode, value.clamp(0.0, 1.0));
    }

    /// Effective brightness for a device in a mode
    pub fn brightness_for(&self, mode: SyncModeKind, device: &DeviceDescriptor) -> f64 {
        self.brightness(mode).unwrap_or(device.brightness)
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self::new(&BrightnessConfig::default(), Rotation::Deg0)
    }
}

/// Everything a mode needs from the running session
pub struct SyncContext {
    pub link: DeviceLink,
    pub devices: Arc<Vec<DeviceDescriptor>>,
    pub params: watch::Receiver<SessionParams>,
    pub timing: SyncTiming,
}

impl SyncContext {
    /// Snapshot of the live parameters
    pub fn params(&self) -> SessionParams {
        self.params.borrow().clone()
    }

    /// Send one frame per device; failures are logged and counted
    pub async fn send_all(&self, frames: &[Vec<Rgb>]) -> usize {
        let mut failures = 0;
        for (device, colors) in self.devices.iter().zip(frames) {
            if let Err(e) = self.link.send_colors(device, colors).await {
                failures += 1;
                tracing::warn!("Error syncing {}: {}", device, e);
            }
        }
        failures
    }
}

/// The active mode of a session
pub enum SyncMode {
    Monitor(MonitorSync),
    Music(MusicSync),
    Edge(EdgeSync),
    Zone(ZoneSync),
    Action(ActionSync),
}

impl SyncMode {
    /// Open the capture sources a mode needs
    ///
    /// Fails when the backend cannot provide them.
    pub fn open(
        kind: SyncModeKind,
        backend: &dyn CaptureBackend,
        config: &SyncConfig,
    ) -> crate::error::Result<Self> {
        let mode = match kind {
            SyncModeKind::Monitor => SyncMode::Monitor(MonitorSync::new(
                backend.open_screen()?,
                config.timing.monitor_steps,
                config.timing.monitor_delay(),
            )),
            SyncModeKind::Music => {
                SyncMode::Music(MusicSync::new(backend.open_audio()?, config.audio.clone()))
            }
            SyncModeKind::Edge => SyncMode::Edge(EdgeSync::new(backend.open_screen()?)),
            SyncModeKind::Zone => SyncMode::Zone(ZoneSync::new(backend.open_screen()?)),
            SyncModeKind::Action => SyncMode::Action(ActionSync::new(
                backend.open_screen()?,
                config.action.clone(),
            )),
        };
        tracing::debug!("Opened {} sync on {} backend", kind, backend.name());
        Ok(mode)
    }

    pub fn kind(&self) -> SyncModeKind {
        match self {
            SyncMode::Monitor(_) => SyncModeKind::Monitor,
            SyncMode::Music(_) => SyncModeKind::Music,
            SyncMode::Edge(_) => SyncModeKind::Edge,
            SyncMode::Zone(_) => SyncModeKind::Zone,
            SyncMode::Action(_) => SyncModeKind::Action,
        }
    }

    /// Run one capture, generate, send iteration
    pub async fn tick(&mut self, ctx: &SyncContext) -> Result<Tick, TickError> {
        match self {
            SyncMode::Monitor(mode) => mode.tick(ctx).await,
            SyncMode::Music(mode) => mode.tick(ctx).await,
            SyncMode::Edge(mode) => mode.tick(ctx).await,
            SyncMode::Zone(mode) => mode.tick(ctx).await,
            SyncMode::Action(mode) => mode.tick(ctx).await,
        }
    }
}

/// Grab a screen frame on the blocking pool
pub(crate) async fn grab_screen(screen: &Arc<dyn ScreenCapture>) -> Result<Option<Frame>, TickError> {
    let screen = Arc::clone(screen);
    match tokio::task::spawn_blocking(move || screen.grab()).await {
        Ok(result) => result.map_err(TickError::from),
        Err(e) => Err(TickError::Fatal(LightError::Capture(format!(
            "screen capture task failed: {}",
            e
        )))),
    }
}

/// Throttled per-frame debug log
pub(crate) fn log_frame(kind: SyncModeKind, frames: u64, devices: usize, failures: usize) {
    if frames % LOG_EVERY == 0 {
        tracing::debug!(
            "{} sync frame {} sent to {} device(s), {} failed",
            kind,
            frames,
            devices,
            failures
        );
    }
}
