use crate::config::{DeviceDefaults, LinkConfig};
use crate::error::{LightError, Result};
use crate::link::DeviceLink;
use crate::protocol::{Command, Envelope, ScanReply};
use crate::types::DeviceDescriptor;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;

const MAX_DATAGRAM: usize = 4096;

/// Locates light strips with a broadcast scan
///
/// Discovery is a best-effort gather: whatever answers within the timeout
/// window is returned, which may be nothing at all.
///
/// # Example
///
/// ```no_run
/// use lanlight_sync::{DeviceLink, DiscoveryClient, LinkConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = LinkConfig::default();
///     let link = DeviceLink::bind(&config)?;
///     let discovery = DiscoveryClient::new(config);
///
///     for device in discovery.discover(&link).await {
///         println!("Found {} at {}", device.model, device.address);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiscoveryClient {
    config: LinkConfig,
    defaults: DeviceDefaults,
}

impl DiscoveryClient {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            defaults: DeviceDefaults::default(),
        }
    }

    /// Use custom defaults for fields a reply does not carry
    pub fn with_defaults(mut self, defaults: DeviceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Scan using the configured timeout
    pub async fn discover(&self, link: &DeviceLink) -> Vec<DeviceDescriptor> {
        self.discover_with_timeout(link, self.config.timeout()).await
    }

    /// Broadcast a scan and collect replies until `timeout` elapses
    ///
    /// Network failures are logged and end the gather with whatever was
    /// collected so far.
    pub async fn discover_with_timeout(&self, link: &DeviceLink, timeout: Duration) -> Vec<DeviceDescriptor> {
        tracing::info!("Broadcasting device scan on port {}", self.config.discovery_port);

        let probe = match serde_json::to_vec(&Envelope::scan()) {
            Ok(probe) => probe,
            Err(e) => {
                tracing::error!("Failed to serialize device scan: {}", e);
                return Vec::new();
            }
        };
        if let Err(e) = link.broadcast(&probe, self.config.discovery_port).await {
            tracing::warn!("Failed to send device scan: {}", e);
            return Vec::new();
        }

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut devices = Vec::new();

        loop {
            let recv = tokio::time::timeout_at(deadline, link.recv_from(&mut buf)).await;
            match recv {
                Ok(Ok((len, from))) => match parse_reply(&buf[..len], from, &self.defaults) {
                    Ok(Some(device)) => {
                        if !devices.iter().any(|d: &DeviceDescriptor| d.identity() == device.identity()) {
                            tracing::info!("Discovered {} at {}:{}", device.model, device.address, device.port);
                            devices.push(device);
                        } else {
                            tracing::debug!("Duplicate reply from {}", device);
                        }
                    }
                    // Our own probe echoed back, or another command
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Skipping malformed reply from {}: {}", from, e);
                    }
                },
                Ok(Err(e)) => {
                    tracing::warn!("Discovery receive error: {}", e);
                    break;
                }
                Err(_) => break,
            }
        }

        tracing::info!("Discovery finished with {} device(s)", devices.len());
        devices
    }
}

/// Parse one datagram into a device
///
/// Returns `Ok(None)` for well-formed messages that are not scan replies.
pub fn parse_reply(
    bytes: &[u8],
    source: SocketAddr,
    defaults: &DeviceDefaults,
) -> Result<Option<DeviceDescriptor>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;

    let cmd = value
        .get("msg")
        .and_then(|m| m.get("cmd"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| LightError::Malformed("reply has no msg.cmd".to_string()))?;
    if cmd != "scan" {
        return Ok(None);
    }

    let envelope: Envelope<ScanReply> = serde_json::from_value(value)?;
    if envelope.msg.cmd != Command::Scan {
        return Ok(None);
    }

    let reply = envelope.msg.data;
    // The probe itself carries no device fields; a broadcast may loop back to us
    if reply.ip.is_none() && reply.sku.is_none() && reply.device.is_none() {
        return Ok(None);
    }

    tracing::debug!(
        "Scan reply from {}: sku={:?} ble={:?} wifi={:?}",
        source,
        reply.sku,
        reply.ble_version_soft,
        reply.wifi_version_soft
    );

    DeviceDescriptor::from_record(reply.into_record(), defaults, Some(source.ip())).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn source() -> SocketAddr {
        "192.168.1.50:4001".parse().unwrap()
    }

    #[test]
    fn test_parse_full_reply() {
        let raw = br#"{"msg":{"cmd":"scan","data":{"ip":"192.168.1.23","device":"AA:BB","sku":"H61D5"}}}"#;
        let device = parse_reply(raw, source(), &DeviceDefaults::default()).unwrap().unwrap();
        assert_eq!(device.address.to_string(), "192.168.1.23");
        assert_eq!(device.model, "H61D5");
        assert_eq!(device.id.as_deref(), Some("AA:BB"));
        assert_eq!(device.port, 4003);
        assert_eq!(device.position, Position::Center);
    }

    #[test]
    fn test_missing_ip_uses_source() {
        let raw = br#"{"msg":{"cmd":"scan","data":{"sku":"H6199"}}}"#;
        let device = parse_reply(raw, source(), &DeviceDefaults::default()).unwrap().unwrap();
        assert_eq!(device.address, source().ip());
    }

    #[test]
    fn test_probe_echo_is_ignored() {
        let raw = serde_json::to_vec(&Envelope::scan()).unwrap();
        assert!(parse_reply(&raw, source(), &DeviceDefaults::default()).unwrap().is_none());
    }

    #[test]
    fn test_other_commands_ignored() {
        let raw = br#"{"msg":{"cmd":"devStatus","data":{"onOff":1}}}"#;
        assert!(parse_reply(raw, source(), &DeviceDefaults::default()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_replies_are_errors() {
        let defaults = DeviceDefaults::default();
        assert!(parse_reply(b"not json", source(), &defaults).is_err());
        assert!(parse_reply(br#"{"hello": 1}"#, source(), &defaults).is_err());
        assert!(parse_reply(
            br#"{"msg":{"cmd":"scan","data":{"ip":"not-an-ip","sku":"H6199"}}}"#,
            source(),
            &defaults
        )
        .is_err());
    }
}
