use crate::capture::CaptureBackend;
use crate::config::SyncConfig;
use crate::error::{LightError, Result};
use crate::events::{EventReceiver, SessionEvent};
use crate::link::DeviceLink;
use crate::modes::{SessionParams, SyncContext, SyncMode, Tick, TickError};
use crate::settings::{Settings, SettingsStore};
use crate::status::{LogStatus, StatusSink};
use crate::types::{DeviceDescriptor, Rotation, SyncModeKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Mode and generation of the session currently considered active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CurrentSession {
    mode: SyncModeKind,
    generation: u64,
}

/// Devices the convenience starts use
#[derive(Debug, Default)]
struct DeviceSet {
    devices: Vec<DeviceDescriptor>,
    selected: usize,
}

/// A spawned worker and the channel that stops it
struct Worker {
    mode: SyncModeKind,
    stop_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// The single worker slot, guarded so starts and stops never interleave
#[derive(Default)]
struct WorkerSlot {
    active: Option<Worker>,
    /// Worker that ignored a stop request and may still be sending
    lingering: Option<JoinHandle<()>>,
}

/// Owns the one active sync session
///
/// Starting a mode stops whatever was running first. Brightness and rotation
/// changes reach a running worker without a restart.
///
/// # Example
///
/// ```no_run
/// use lanlight_sync::{
///     DeviceLink, DiscoveryClient, SessionController, SyncConfig, SyncModeKind, SyntheticBackend,
/// };
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = SyncConfig::default();
///     let link = DeviceLink::bind(&config.link)?;
///     let devices = DiscoveryClient::new(config.link.clone()).discover(&link).await;
///
///     let controller = SessionController::new(link, Arc::new(SyntheticBackend::default()), config);
///     controller.start(SyncModeKind::Edge, devices).await?;
///     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
///     controller.stop().await;
///     Ok(())
/// }
/// ```
pub struct SessionController {
    link: DeviceLink,
    backend: Arc<dyn CaptureBackend>,
    config: SyncConfig,
    status: Arc<dyn StatusSink>,
    store: Option<Arc<dyn SettingsStore>>,
    params_tx: watch::Sender<SessionParams>,
    events_tx: broadcast::Sender<SessionEvent>,
    devices: Mutex<DeviceSet>,
    current: Arc<Mutex<Option<CurrentSession>>>,
    generation: AtomicU64,
    slot: tokio::sync::Mutex<WorkerSlot>,
}

impl SessionController {
    pub fn new(link: DeviceLink, backend: Arc<dyn CaptureBackend>, config: SyncConfig) -> Self {
        let params = SessionParams::new(&config.brightness, config.device_defaults.color_rotation);
        let (params_tx, _) = watch::channel(params);
        let (events_tx, _) = broadcast::channel(32);

        Self {
            link,
            backend,
            config,
            status: Arc::new(LogStatus),
            store: None,
            params_tx,
            events_tx,
            devices: Mutex::new(DeviceSet::default()),
            current: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            slot: tokio::sync::Mutex::new(WorkerSlot::default()),
        }
    }

    /// Send progress messages to `sink` instead of the log
    pub fn with_status(mut self, sink: impl StatusSink + 'static) -> Self {
        self.status = Arc::new(sink);
        self
    }

    /// Persist rotation and reload devices through `store`
    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn link(&self) -> &DeviceLink {
        &self.link
    }

    fn report(&self, message: &str) {
        self.status.status(message);
    }

    /// Start a sync mode on `devices`, stopping any running session first
    ///
    /// Returns once the worker is spawned.
    pub async fn start(&self, mode: SyncModeKind, devices: Vec<DeviceDescriptor>) -> Result<()> {
        if devices.is_empty() {
            self.report("No devices available. Please discover devices first.");
            return Err(LightError::NoDevices);
        }

        let mut slot = self.slot.lock().await;
        if slot.active.is_some() {
            self.stop_locked(&mut slot).await;
        }

        if let Some(mut lingering) = slot.lingering.take() {
            if !lingering.is_finished() {
                tracing::info!("Waiting for previous sync worker to exit");
                if timeout(self.config.timing.reclaim_timeout(), &mut lingering).await.is_err() {
                    slot.lingering = Some(lingering);
                    self.report("Previous sync is still shutting down, try again later");
                    return Err(LightError::SessionBusy);
                }
            }
        }

        let label = mode.label();
        self.report(&format!("Starting {} sync...", label.to_lowercase()));

        let sync_mode = match SyncMode::open(mode, self.backend.as_ref(), &self.config) {
            Ok(sync_mode) => sync_mode,
            Err(e) => {
                tracing::error!("Failed to open {} sync: {}", mode, e);
                self.report(&format!("Error starting {} sync: {}", label.to_lowercase(), e));
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.lock().unwrap() = Some(CurrentSession { mode, generation });

        let started = format!(
            "{} sync started with {} device(s) ({}) at {:.0}% brightness",
            label,
            devices.len(),
            device_names(&devices),
            self.start_brightness(mode, &devices) * 100.0
        );
        let device_count = devices.len();

        let (stop_tx, stop_rx) = broadcast::channel(1);
        let worker = SessionWorker {
            mode: sync_mode,
            ctx: SyncContext {
                link: self.link.clone(),
                devices: Arc::new(devices),
                params: self.params_tx.subscribe(),
                timing: self.config.timing.clone(),
            },
            stop_rx,
            status: Arc::clone(&self.status),
            events_tx: self.events_tx.clone(),
            current: Arc::clone(&self.current),
            generation,
        };
        let _ = self.events_tx.send(SessionEvent::Started {
            mode,
            devices: device_count,
        });
        let handle = tokio::spawn(worker.run());
        slot.active = Some(Worker {
            mode,
            stop_tx,
            handle,
        });

        tracing::info!("{} sync session {} started", mode, generation);
        self.report(&started);
        Ok(())
    }

    /// Stop the running session, waiting a bounded time for it to exit
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot).await;
    }

    async fn stop_locked(&self, slot: &mut WorkerSlot) {
        let Some(worker) = slot.active.take() else {
            return;
        };

        tracing::info!("Stopping {} sync", worker.mode);
        let _ = worker.stop_tx.send(());

        let mut handle = worker.handle;
        match timeout(self.config.timing.stop_timeout(), &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("{} sync worker ended abnormally: {}", worker.mode, e),
            Err(_) => {
                tracing::warn!(
                    "{} sync did not stop within {:?}",
                    worker.mode,
                    self.config.timing.stop_timeout()
                );
                self.report(&format!(
                    "Warning: {} sync did not stop cleanly",
                    worker.mode.label().to_lowercase()
                ));
                slot.lingering = Some(handle);
            }
        }

        *self.current.lock().unwrap() = None;
        self.report("Sync stopped");
    }

    fn start_brightness(&self, mode: SyncModeKind, devices: &[DeviceDescriptor]) -> f64 {
        let params = self.params_tx.borrow();
        match params.brightness(mode) {
            Some(value) => value,
            None => devices.iter().map(|d| d.brightness).sum::<f64>() / devices.len().max(1) as f64,
        }
    }

    /// Mode of the running session, if any
    pub fn current_mode(&self) -> Option<SyncModeKind> {
        self.current.lock().unwrap().map(|c| c.mode)
    }

    pub fn is_syncing(&self) -> bool {
        self.current_mode().is_some()
    }

    pub fn subscribe_events(&self) -> EventReceiver {
        EventReceiver::new(self.events_tx.subscribe())
    }

    /// Replace the device set; selection resets to the first device
    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        let mut set = self.devices.lock().unwrap();
        set.devices = devices;
        set.selected = 0;
    }

    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.devices.lock().unwrap().devices.clone()
    }

    /// Select a device by address, adding it when unknown
    pub fn set_device(&self, device: DeviceDescriptor) {
        let mut set = self.devices.lock().unwrap();
        match set.devices.iter().position(|d| d.address == device.address) {
            Some(index) => {
                set.devices[index] = device;
                set.selected = index;
            }
            None => {
                set.devices.push(device);
                set.selected = set.devices.len() - 1;
            }
        }
    }

    pub fn selected_device(&self) -> Option<DeviceDescriptor> {
        let set = self.devices.lock().unwrap();
        set.devices.get(set.selected).cloned()
    }

    /// Set a mode's brightness (clamped to 0..=1); applies to a running session
    pub fn set_brightness(&self, mode: SyncModeKind, value: f64) {
        self.params_tx.send_modify(|params| params.set_brightness(mode, value));
        tracing::debug!("{} brightness set to {:.2}", mode, value.clamp(0.0, 1.0));
    }

    /// Brightness override for a mode; `None` means each device's own value
    pub fn brightness(&self, mode: SyncModeKind) -> Option<f64> {
        self.params_tx.borrow().brightness(mode)
    }

    /// Set the 4-LED color rotation in degrees
    ///
    /// Unsupported angles fall back to 0. The result is persisted when a
    /// settings store is configured.
    pub fn set_color_rotation(&self, degrees: i64) -> Rotation {
        let rotation = Rotation::from_degrees(degrees);
        self.params_tx.send_modify(|params| params.rotation = rotation);
        tracing::info!("Color rotation set to {}", rotation);

        if let Some(store) = &self.store {
            let settings = match store.load() {
                Ok(Some(mut settings)) => {
                    settings.color_rotation = rotation;
                    settings
                }
                Ok(None) => Settings::new(self.devices(), rotation),
                Err(e) => {
                    tracing::warn!("Could not read settings, rewriting them: {}", e);
                    Settings::new(self.devices(), rotation)
                }
            };
            if let Err(e) = store.save(&settings) {
                tracing::warn!("Failed to persist color rotation: {}", e);
            }
        }
        rotation
    }

    pub fn color_rotation(&self) -> Rotation {
        self.params_tx.borrow().rotation
    }

    /// Refresh the device set and rotation from the settings store
    ///
    /// Without a store the current device set is returned unchanged.
    pub fn load_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let Some(store) = &self.store else {
            return Ok(self.devices());
        };

        match store.load() {
            Ok(Some(settings)) => {
                self.params_tx
                    .send_modify(|params| params.rotation = settings.color_rotation);
                let mut set = self.devices.lock().unwrap();
                set.selected = settings.selected_device;
                set.devices = settings.devices;
                Ok(set.devices.clone())
            }
            Ok(None) => Ok(self.devices()),
            Err(e) => {
                self.report(&format!("Error loading devices: {}", e));
                Err(e)
            }
        }
    }

    async fn start_with_loaded(&self, mode: SyncModeKind) -> Result<()> {
        let devices = self.load_devices()?;
        self.start(mode, devices).await
    }

    pub async fn start_monitor(&self) -> Result<()> {
        self.start_with_loaded(SyncModeKind::Monitor).await
    }

    pub async fn start_music(&self) -> Result<()> {
        self.start_with_loaded(SyncModeKind::Music).await
    }

    pub async fn start_edge(&self) -> Result<()> {
        self.start_with_loaded(SyncModeKind::Edge).await
    }

    pub async fn start_zone(&self) -> Result<()> {
        self.start_with_loaded(SyncModeKind::Zone).await
    }

    pub async fn start_action(&self) -> Result<()> {
        self.start_with_loaded(SyncModeKind::Action).await
    }
}

fn device_names(devices: &[DeviceDescriptor]) -> String {
    devices
        .iter()
        .map(|d| d.model.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// State moved into the spawned worker task
struct SessionWorker {
    mode: SyncMode,
    ctx: SyncContext,
    stop_rx: broadcast::Receiver<()>,
    status: Arc<dyn StatusSink>,
    events_tx: broadcast::Sender<SessionEvent>,
    current: Arc<Mutex<Option<CurrentSession>>>,
    generation: u64,
}

impl SessionWorker {
    async fn run(mut self) {
        let kind = self.mode.kind();
        let label = kind.label();

        for device in self.ctx.devices.iter() {
            if let Err(e) = self.ctx.link.switch_mode(device, true).await {
                tracing::warn!("Failed to enable razer mode on {}: {}", device, e);
                self.status
                    .status(&format!("Error enabling Razer mode on {}: {}", device.model, e));
            }
        }
        self.status.status(&format!(
            "{} sync running on {} device(s) ({})",
            label,
            self.ctx.devices.len(),
            device_names(&self.ctx.devices)
        ));

        let failure = loop {
            if self.stop_requested() {
                break None;
            }

            match self.mode.tick(&self.ctx).await {
                Ok(Tick::Sent) => {}
                Ok(Tick::Idle) => {
                    if self.pause(self.ctx.timing.idle()).await {
                        break None;
                    }
                }
                Err(TickError::Recoverable(e)) => {
                    tracing::warn!("Error in {} sync: {}", kind, e);
                    if self.pause(self.ctx.timing.error_backoff()).await {
                        break None;
                    }
                }
                Err(TickError::Fatal(e)) => {
                    tracing::error!("{} sync failed: {}", kind, e);
                    break Some(e.to_string());
                }
            }
        };

        for device in self.ctx.devices.iter() {
            if let Err(e) = self.ctx.link.switch_mode(device, false).await {
                tracing::warn!("Failed to disable razer mode on {}: {}", device, e);
            }
        }

        let event = match failure {
            Some(reason) => {
                self.status.status(&format!("{} sync error: {}", label, reason));
                SessionEvent::Failed { mode: kind, reason }
            }
            None => SessionEvent::Stopped { mode: kind },
        };
        let _ = self.events_tx.send(event);
        self.status.status(&format!("{} sync stopped", label));

        let mut current = self.current.lock().unwrap();
        if current.map(|c| c.generation) == Some(self.generation) {
            *current = None;
        }
        tracing::info!("{} sync session {} exited", kind, self.generation);
    }

    /// A stop was sent, or the controller is gone
    fn stop_requested(&mut self) -> bool {
        !matches!(
            self.stop_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        )
    }

    /// Sleep, returning early with `true` if stopped meanwhile
    async fn pause(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.stop_rx.recv() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}
