use crate::error::Result;
use crate::types::{Position, Rotation, SyncModeKind};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Network settings shared by discovery and the device link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Address discovery probes are broadcast to
    pub broadcast_addr: Ipv4Addr,
    /// Port devices listen on for discovery probes
    pub discovery_port: u16,
    /// Local port replies arrive on (the link binds here)
    pub listen_port: u16,
    /// How long discovery gathers replies, in milliseconds
    pub timeout_ms: u64,
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: Ipv4Addr::BROADCAST,
            discovery_port: 4001,
            listen_port: 4002,
            timeout_ms: 1000,
        }
    }
}

/// Values applied to any device field a reply or settings file omits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    /// Port devices accept commands on
    pub port: u16,
    pub position: Position,
    pub sync_mode: SyncModeKind,
    pub brightness: f64,
    pub led_count: u8,
    pub color_rotation: Rotation,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            port: 4003,
            position: Position::Center,
            sync_mode: SyncModeKind::Monitor,
            brightness: 0.75,
            led_count: 4,
            color_rotation: Rotation::Deg0,
        }
    }
}

/// Loop pacing for sync workers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTiming {
    /// Interpolation steps between monitor frames
    #[serde(default = "default_monitor_steps")]
    pub monitor_steps: u32,
    /// Delay after each interpolation step, in milliseconds
    #[serde(default = "default_monitor_delay_ms")]
    pub monitor_delay_ms: u64,
    /// Pause after a failed iteration, in milliseconds
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Pause when a capture returned nothing, in milliseconds
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    /// How long `stop` waits for the worker to exit, in milliseconds
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// How long `start` waits for a worker that outlived `stop`, in milliseconds
    #[serde(default = "default_reclaim_timeout_ms")]
    pub reclaim_timeout_ms: u64,
}

fn default_monitor_steps() -> u32 {
    3
}

fn default_monitor_delay_ms() -> u64 {
    2
}

fn default_error_backoff_ms() -> u64 {
    100
}

fn default_idle_ms() -> u64 {
    10
}

fn default_stop_timeout_ms() -> u64 {
    2000
}

fn default_reclaim_timeout_ms() -> u64 {
    10_000
}

impl SyncTiming {
    pub fn monitor_delay(&self) -> Duration {
        Duration::from_millis(self.monitor_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn reclaim_timeout(&self) -> Duration {
        Duration::from_millis(self.reclaim_timeout_ms)
    }
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            monitor_steps: default_monitor_steps(),
            monitor_delay_ms: default_monitor_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            idle_ms: default_idle_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            reclaim_timeout_ms: default_reclaim_timeout_ms(),
        }
    }
}

/// Flash detection tuning for action mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Brightness increase (0-1) that counts as a flash
    pub flash_threshold: f64,
    /// How long a flash lasts, in milliseconds
    pub flash_duration_ms: u64,
    /// Final part of the flash spent fading back, in milliseconds
    pub fade_ms: u64,
    /// Brightness baseline before the first frame
    pub initial_baseline: f64,
}

impl ActionConfig {
    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.flash_duration_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            flash_threshold: 0.3,
            flash_duration_ms: 500,
            fade_ms: 200,
            initial_baseline: 0.5,
        }
    }
}

/// Audio capture parameters for music mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Length of each recorded buffer, in milliseconds
    pub duration_ms: u64,
}

impl AudioConfig {
    /// Number of frames recorded per iteration
    pub fn frames(&self) -> usize {
        (self.sample_rate as u64 * self.duration_ms / 1000) as usize
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            duration_ms: 10,
        }
    }
}

/// Default brightness per sync mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    pub monitor: f64,
    pub music: f64,
    /// Edge, zone and action modes use this when set, the device's own
    /// brightness otherwise
    pub ambient: Option<f64>,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            monitor: 0.75,
            music: 0.85,
            ambient: None,
        }
    }
}

/// Everything a session controller needs to know up front
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub link: LinkConfig,
    pub device_defaults: DeviceDefaults,
    pub timing: SyncTiming,
    pub action: ActionConfig,
    pub audio: AudioConfig,
    pub brightness: BrightnessConfig,
}

impl SyncConfig {
    /// Parse a configuration document; missing sections keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.link.discovery_port, 4001);
        assert_eq!(config.link.listen_port, 4002);
        assert_eq!(config.link.timeout(), Duration::from_secs(1));
        assert_eq!(config.timing.stop_timeout(), Duration::from_secs(2));
        assert_eq!(config.audio.frames(), 480);
        assert_eq!(config.action.flash_threshold, 0.3);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            SyncConfig::from_json(r#"{"link": {"timeout_ms": 250}, "timing": {"monitor_steps": 5}}"#).unwrap();
        assert_eq!(config.link.timeout_ms, 250);
        assert_eq!(config.link.listen_port, 4002);
        assert_eq!(config.timing.monitor_steps, 5);
        assert_eq!(config.timing.error_backoff_ms, 100);
        assert_eq!(config.brightness.music, 0.85);
    }
}
