use crate::types::DeviceRecord;
use serde::{Deserialize, Serialize};

/// Top-level envelope every datagram is wrapped in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub msg: Message<T>,
}

/// Command name plus its payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<T> {
    pub cmd: Command,
    pub data: T,
}

/// Commands the light strips understand
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Discovery probe and its reply
    Scan,
    /// Externally driven lighting: mode switch and color frames
    Razer,
    /// Anything else a device may send back
    #[serde(other)]
    Other,
}

/// Payload of a discovery probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub account_topic: String,
}

/// Payload of a razer command: a base64 packet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazerData {
    pub pt: String,
}

/// Payload of a discovery reply
///
/// Only the fields used to build a device are modelled; firmware versions
/// are kept for logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReply {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub ble_version_soft: Option<String>,
    #[serde(default)]
    pub wifi_version_soft: Option<String>,
}

impl ScanReply {
    /// Loose device record; configuration defaults are applied later
    pub fn into_record(self) -> DeviceRecord {
        DeviceRecord {
            ip: self.ip,
            model: self.sku,
            device: self.device,
            ..DeviceRecord::default()
        }
    }
}

impl<T> Envelope<T> {
    pub fn new(cmd: Command, data: T) -> Self {
        Self {
            msg: Message { cmd, data },
        }
    }
}

impl Envelope<ScanRequest> {
    /// Broadcast probe that makes devices announce themselves
    pub fn scan() -> Self {
        Self::new(
            Command::Scan,
            ScanRequest {
                account_topic: "reserve".to_string(),
            },
        )
    }
}

impl Envelope<RazerData> {
    /// Razer command carrying an already base64-encoded packet
    pub fn razer(pt: impl Into<String>) -> Self {
        Self::new(Command::Razer, RazerData { pt: pt.into() })
    }
}
