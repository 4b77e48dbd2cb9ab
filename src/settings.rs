use crate::config::DeviceDefaults;
use crate::discovery::DiscoveryClient;
use crate::error::{LightError, Result};
use crate::link::DeviceLink;
use crate::types::{DeviceDescriptor, DeviceRecord, Rotation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Age after which stored devices are rediscovered
pub const STALE_AFTER_SECS: f64 = 86_400.0;

/// Persisted device list and session preferences
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub devices: Vec<DeviceDescriptor>,
    pub selected_device: usize,
    pub color_rotation: Rotation,
    /// Seconds since the Unix epoch when the devices were discovered
    pub time: f64,
}

/// On-disk shape; devices are loose records until defaults are applied
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    devices: Vec<DeviceRecord>,
    #[serde(default)]
    selected_device: usize,
    #[serde(default, alias = "color_rotation")]
    color_rotation: Rotation,
    #[serde(default)]
    time: f64,
}

impl Settings {
    /// Fresh settings stamped with the current time
    pub fn new(devices: Vec<DeviceDescriptor>, color_rotation: Rotation) -> Self {
        Self {
            devices,
            selected_device: 0,
            color_rotation,
            time: now_secs(),
        }
    }

    /// Parse stored JSON, filling device gaps from `defaults`
    ///
    /// Records that cannot become a device (e.g. a bad address) are skipped.
    pub fn from_json(json: &str, defaults: &DeviceDefaults) -> Result<Self> {
        let stored: StoredSettings = serde_json::from_str(json)?;
        let devices = stored
            .devices
            .into_iter()
            .filter_map(|record| match DeviceDescriptor::from_record(record, defaults, None) {
                Ok(device) => Some(device),
                Err(e) => {
                    tracing::warn!("Skipping stored device: {}", e);
                    None
                }
            })
            .collect();

        Ok(Self {
            devices,
            selected_device: stored.selected_device,
            color_rotation: stored.color_rotation,
            time: stored.time,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the device list is older than a day at `now` (epoch seconds)
    pub fn is_stale(&self, now: f64) -> bool {
        now - self.time > STALE_AFTER_SECS
    }

    /// The selected device, if the index is in range
    pub fn selected(&self) -> Option<&DeviceDescriptor> {
        self.devices.get(self.selected_device)
    }
}

/// Where settings are kept between runs
pub trait SettingsStore: Send + Sync {
    /// Load stored settings; `Ok(None)` when nothing was stored yet
    fn load(&self) -> Result<Option<Settings>>;

    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    defaults: DeviceDefaults,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            defaults: DeviceDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: DeviceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Settings>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Settings::from_json(&json, &self.defaults)
            .map(Some)
            .map_err(|e| LightError::Settings(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, settings.to_json()?)?;
        tracing::debug!("Saved {} device(s) to {}", settings.devices.len(), self.path.display());
        Ok(())
    }
}

/// Settings kept in memory only
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Option<Settings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<Settings>> {
        Ok(self.settings.lock().unwrap().clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

/// Stored settings when fresh, otherwise a new discovery saved back
///
/// Missing, unreadable or day-old settings all trigger rediscovery. A failed
/// save is logged and the discovered settings are still returned.
pub async fn load_or_discover(
    store: &dyn SettingsStore,
    discovery: &DiscoveryClient,
    link: &DeviceLink,
) -> Settings {
    let mut rotation = Rotation::default();
    match store.load() {
        Ok(Some(settings)) if !settings.is_stale(now_secs()) => {
            tracing::info!("Loaded {} device(s) from settings", settings.devices.len());
            return settings;
        }
        Ok(Some(settings)) => {
            tracing::info!("Device data is older than 24 hours, requesting new data");
            rotation = settings.color_rotation;
        }
        Ok(None) => tracing::info!("No stored settings, requesting device data"),
        Err(e) => tracing::warn!("Stored settings unusable, requesting device data: {}", e),
    }

    let settings = Settings::new(discovery.discover(link).await, rotation);
    if let Err(e) = store.save(&settings) {
        tracing::warn!("Failed to save settings: {}", e);
    }
    settings
}

/// Current time in epoch seconds
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
