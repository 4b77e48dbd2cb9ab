use crate::config::DeviceDefaults;
use crate::error::{LightError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// An 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Fallback color used when a region cannot be sampled
    pub const NEUTRAL_GRAY: Rgb = Rgb::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels in wire order
    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// Physical placement of a light strip relative to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Bottom,
    Left,
    Right,
    #[default]
    Center,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Top => "top",
            Position::Bottom => "bottom",
            Position::Left => "left",
            Position::Right => "right",
            Position::Center => "center",
        }
    }
}

impl FromStr for Position {
    type Err = LightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Position::Top),
            "bottom" => Ok(Position::Bottom),
            "left" => Ok(Position::Left),
            "right" => Ok(Position::Right),
            "center" => Ok(Position::Center),
            other => Err(LightError::Malformed(format!("unknown position '{}'", other))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sync algorithms a session can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncModeKind {
    #[default]
    Monitor,
    Music,
    Edge,
    Zone,
    Action,
}

impl SyncModeKind {
    pub const ALL: [SyncModeKind; 5] = [
        SyncModeKind::Monitor,
        SyncModeKind::Music,
        SyncModeKind::Edge,
        SyncModeKind::Zone,
        SyncModeKind::Action,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncModeKind::Monitor => "monitor",
            SyncModeKind::Music => "music",
            SyncModeKind::Edge => "edge",
            SyncModeKind::Zone => "zone",
            SyncModeKind::Action => "action",
        }
    }

    /// Human readable label used in status messages
    pub fn label(self) -> &'static str {
        match self {
            SyncModeKind::Monitor => "Monitor",
            SyncModeKind::Music => "Music",
            SyncModeKind::Edge => "Edge lighting",
            SyncModeKind::Zone => "Zone lighting",
            SyncModeKind::Action => "Action detection",
        }
    }
}

impl FromStr for SyncModeKind {
    type Err = LightError;

    fn from_str(s: &str) -> Result<Self> {
        SyncModeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LightError::Malformed(format!("unknown sync mode '{}'", s)))
    }
}

impl fmt::Display for SyncModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation correction applied to 4-LED layouts
///
/// Serialized as the angle in degrees. Any angle other than 0/90/180/270
/// falls back to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Build a rotation from degrees, falling back to 0 for unsupported angles
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees {
            0 => Rotation::Deg0,
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            other => {
                tracing::warn!("Invalid rotation angle {}°, using 0°", other);
                Rotation::Deg0
            }
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Index mapping: output slot `i` takes input color `permutation()[i]`
    ///
    /// Input order is top-left, top-right, bottom-left, bottom-right.
    pub fn permutation(self) -> [usize; 4] {
        match self {
            Rotation::Deg0 => [0, 1, 2, 3],
            Rotation::Deg90 => [2, 0, 3, 1],
            Rotation::Deg180 => [3, 2, 1, 0],
            Rotation::Deg270 => [1, 3, 0, 2],
        }
    }

    /// Reorder a 4-color result; other lengths pass through unchanged
    pub fn apply(self, colors: Vec<Rgb>) -> Vec<Rgb> {
        if colors.len() != 4 || self == Rotation::Deg0 {
            return colors;
        }
        self.permutation().iter().map(|&i| colors[i]).collect()
    }

    /// The next rotation clockwise
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }
}

impl From<i64> for Rotation {
    fn from(degrees: i64) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Device record as it appears in discovery replies and on disk
///
/// Every field is optional; [`DeviceDescriptor::from_record`] fills the gaps
/// from [`DeviceDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, alias = "sku")]
    pub model: Option<String>,
    /// Hardware identifier (usually the MAC-like id the device reports)
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, alias = "led_count")]
    pub nled: Option<i64>,
    #[serde(default)]
    pub sync_mode: Option<String>,
    #[serde(default)]
    pub brightness: Option<f64>,
    #[serde(default)]
    pub color_rotation: Option<i64>,
}

/// A light strip reachable on the local network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    #[serde(rename = "ip")]
    pub address: IpAddr,
    pub port: u16,
    pub model: String,
    #[serde(rename = "device", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub position: Position,
    #[serde(rename = "nled")]
    pub led_count: u8,
    pub sync_mode: SyncModeKind,
    pub brightness: f64,
    pub color_rotation: Rotation,
}

impl DeviceDescriptor {
    /// Merge a loosely-typed record with configuration defaults
    ///
    /// `fallback_ip` is used when the record carries no address (e.g. the
    /// source address of a discovery reply).
    pub fn from_record(
        record: DeviceRecord,
        defaults: &DeviceDefaults,
        fallback_ip: Option<IpAddr>,
    ) -> Result<Self> {
        let address = match record.ip.as_deref() {
            Some(ip) => ip
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| LightError::Malformed(format!("invalid device address '{}'", ip)))?,
            None => fallback_ip
                .ok_or_else(|| LightError::Malformed("device record has no address".to_string()))?,
        };

        let position = match record.position.as_deref() {
            Some(p) => p.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using {}", e, defaults.position);
                defaults.position
            }),
            None => defaults.position,
        };

        let sync_mode = match record.sync_mode.as_deref() {
            Some(m) => m.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using {}", e, defaults.sync_mode);
                defaults.sync_mode
            }),
            None => defaults.sync_mode,
        };

        let led_count = match record.nled {
            Some(n) if (1..=255).contains(&n) => n as u8,
            Some(n) => {
                tracing::warn!("LED count {} out of range, using {}", n, defaults.led_count);
                defaults.led_count
            }
            None => defaults.led_count,
        };

        Ok(Self {
            address,
            port: record.port.unwrap_or(defaults.port),
            model: record.model.unwrap_or_else(|| "Unknown".to_string()),
            id: record.device,
            position,
            led_count,
            sync_mode,
            brightness: record
                .brightness
                .map(|b| b.clamp(0.0, 1.0))
                .unwrap_or(defaults.brightness),
            color_rotation: record
                .color_rotation
                .map(Rotation::from_degrees)
                .unwrap_or(defaults.color_rotation),
        })
    }

    /// Socket address commands are sent to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Number of LEDs as a `usize`
    pub fn leds(&self) -> usize {
        self.led_count as usize
    }

    /// Key used to de-duplicate discovery replies
    pub fn identity(&self) -> (IpAddr, &str) {
        (self.address, self.model.as_str())
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_permutations_are_bijections() {
        for degrees in [0, 90, 180, 270] {
            let mut seen = [false; 4];
            for i in Rotation::from_degrees(degrees).permutation() {
                assert!(!seen[i], "index {} repeated for {}°", i, degrees);
                seen[i] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn test_rotation_zero_is_identity() {
        let colors = vec![
            Rgb::new(1, 0, 0),
            Rgb::new(2, 0, 0),
            Rgb::new(3, 0, 0),
            Rgb::new(4, 0, 0),
        ];
        assert_eq!(Rotation::Deg0.apply(colors.clone()), colors);
    }

    #[test]
    fn test_rotation_90_moves_bottom_left_to_first_slot() {
        let colors = vec![
            Rgb::new(1, 0, 0),
            Rgb::new(2, 0, 0),
            Rgb::new(3, 0, 0),
            Rgb::new(4, 0, 0),
        ];
        let rotated = Rotation::Deg90.apply(colors);
        assert_eq!(
            rotated.iter().map(|c| c.r).collect::<Vec<_>>(),
            vec![3, 1, 4, 2]
        );
    }

    #[test]
    fn test_rotation_ignores_other_lengths() {
        let colors = vec![Rgb::WHITE, Rgb::BLACK, Rgb::NEUTRAL_GRAY];
        assert_eq!(Rotation::Deg180.apply(colors.clone()), colors);
    }

    #[test]
    fn test_invalid_rotation_falls_back_to_zero() {
        assert_eq!(Rotation::from_degrees(45), Rotation::Deg0);
        let parsed: Rotation = serde_json::from_str("135").unwrap();
        assert_eq!(parsed, Rotation::Deg0);
        assert_eq!(serde_json::to_string(&Rotation::Deg270).unwrap(), "270");
    }

    #[test]
    fn test_record_defaults_fill_missing_fields() {
        let record: DeviceRecord =
            serde_json::from_str(r#"{"ip": "192.168.1.40", "sku": "H61D5"}"#).unwrap();
        let device = DeviceDescriptor::from_record(record, &DeviceDefaults::default(), None).unwrap();

        assert_eq!(device.model, "H61D5");
        assert_eq!(device.port, 4003);
        assert_eq!(device.position, Position::Center);
        assert_eq!(device.led_count, 4);
        assert_eq!(device.sync_mode, SyncModeKind::Monitor);
        assert_eq!(device.brightness, 0.75);
        assert_eq!(device.color_rotation, Rotation::Deg0);
    }

    #[test]
    fn test_record_out_of_range_values_use_defaults() {
        let record: DeviceRecord = serde_json::from_str(
            r#"{"ip": "10.0.0.2", "nled": 300, "position": "diagonal", "brightness": 3.0}"#,
        )
        .unwrap();
        let device = DeviceDescriptor::from_record(record, &DeviceDefaults::default(), None).unwrap();

        assert_eq!(device.led_count, 4);
        assert_eq!(device.position, Position::Center);
        assert_eq!(device.brightness, 1.0);
        assert_eq!(device.model, "Unknown");
    }

    #[test]
    fn test_record_without_address_uses_fallback() {
        let fallback: IpAddr = "10.1.1.9".parse().unwrap();
        let device =
            DeviceDescriptor::from_record(DeviceRecord::default(), &DeviceDefaults::default(), Some(fallback))
                .unwrap();
        assert_eq!(device.address, fallback);

        let missing = DeviceDescriptor::from_record(DeviceRecord::default(), &DeviceDefaults::default(), None);
        assert!(matches!(missing, Err(LightError::Malformed(_))));
    }

    #[test]
    fn test_descriptor_round_trips_through_record() {
        let device = DeviceDescriptor {
            address: "192.168.1.7".parse().unwrap(),
            port: 4003,
            model: "H6199".to_string(),
            id: Some("AA:BB".to_string()),
            position: Position::Left,
            led_count: 10,
            sync_mode: SyncModeKind::Edge,
            brightness: 0.5,
            color_rotation: Rotation::Deg180,
        };
        let json = serde_json::to_string(&device).unwrap();
        let record: DeviceRecord = serde_json::from_str(&json).unwrap();
        let back = DeviceDescriptor::from_record(record, &DeviceDefaults::default(), None).unwrap();
        assert_eq!(back, device);
    }
}
