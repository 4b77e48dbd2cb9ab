//! Rust library for syncing networked RGB light strips to screen and audio
//!
//! This library provides an async API for discovering LED strips on the local
//! network and driving them in real time. It supports:
//!
//! - Discovery via UDP broadcast scan
//! - The binary color frame format with checksum verification
//! - Screen mirroring with vibrant-color sampling and smoothing
//! - Music visualisation from audio amplitude
//! - Edge and zone lighting based on where each strip sits
//! - Flash detection for games and films
//! - Live brightness and color rotation changes
//! - Persisted device lists with daily rediscovery
//!
//! # Quick Start
//!
//! ```no_run
//! use lanlight_sync::{DeviceLink, DiscoveryClient, SessionController, SyncConfig, SyntheticBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let link = DeviceLink::bind(&config.link)?;
//!
//!     // Find strips on the network
//!     let devices = DiscoveryClient::new(config.link.clone()).discover(&link).await;
//!     for device in &devices {
//!         println!("Found {} at {}", device.model, device.address);
//!     }
//!
//!     // Drive them from a capture backend
//!     let controller = SessionController::new(link, Arc::new(SyntheticBackend::default()), config)
//!         .with_status(|message: &str| println!("{}", message));
//!     controller.set_devices(devices);
//!     controller.start_monitor().await?;
//!
//!     tokio::time::sleep(tokio::time::Duration::from_secs(10)).await;
//!     controller.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Sending frames directly
//!
//! ```no_run
//! use lanlight_sync::{DeviceLink, LinkConfig, Rgb};
//!
//! # async fn example(device: lanlight_sync::DeviceDescriptor) -> lanlight_sync::Result<()> {
//! let link = DeviceLink::bind(&LinkConfig::default())?;
//! link.switch_mode(&device, true).await?;
//! link.send_colors(&device, &vec![Rgb::new(255, 0, 80); device.leds()]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Codec**: color frame packets and their base64 transport form
//! - **Link**: the shared UDP socket and the JSON command envelope
//! - **Discovery**: broadcast scan and reply parsing
//! - **Sampler / Interpolate**: pure color extraction and blending
//! - **Modes**: per-mode capture, generate, send state machines
//! - **Session**: the single active sync worker and its parameters
//! - **Settings**: device list persistence

pub mod capture;
pub mod codec;
mod config;
mod discovery;
mod error;
mod events;
pub mod frame;
pub mod interpolate;
mod link;
pub mod modes;
mod protocol;
pub mod sampler;
mod session;
pub mod settings;
mod status;
mod types;

// Public exports
pub use capture::{AudioCapture, CaptureBackend, ScreenCapture, SyntheticBackend};
pub use config::{
    ActionConfig, AudioConfig, BrightnessConfig, DeviceDefaults, LinkConfig, SyncConfig, SyncTiming,
};
pub use discovery::{parse_reply, DiscoveryClient};
pub use error::{LightError, Result};
pub use events::{EventReceiver, SessionEvent};
pub use frame::{Frame, Rect};
pub use interpolate::{Interpolator, TransitionReport, TransitionTarget};
pub use link::DeviceLink;
pub use modes::{ActionDetector, SessionParams, SyncMode, Tick, TickError};
pub use protocol::{Command, Envelope, Message, RazerData, ScanReply, ScanRequest};
pub use session::SessionController;
pub use settings::{JsonFileStore, MemoryStore, Settings, SettingsStore};
pub use status::{LogStatus, StatusSink};
pub use types::{DeviceDescriptor, DeviceRecord, Position, Rgb, Rotation, SyncModeKind};
