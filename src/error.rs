use thiserror::Error;

/// Result type for light sync operations
pub type Result<T> = std::result::Result<T, LightError>;

/// Errors that can occur when talking to light strips or running a sync session
#[derive(Error, Debug)]
pub enum LightError {
    /// More colors than a single count byte can describe
    #[error("Frame holds {count} colors, at most {max} fit in one packet")]
    Capacity {
        /// Number of colors that were passed in
        count: usize,
        /// Largest count the wire format can carry
        max: usize,
    },

    /// Packet checksum did not match the XOR of its contents
    #[error("Checksum mismatch: packet says {expected:#04x}, contents fold to {actual:#04x}")]
    Checksum {
        /// Checksum byte found in the packet
        expected: u8,
        /// Checksum recomputed from the packet contents
        actual: u8,
    },

    /// Packet or reply could not be parsed
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Color frame length does not match the device's LED count
    #[error("Frame has {actual} colors but device has {expected} LEDs")]
    FrameLength {
        /// LED count of the target device
        expected: usize,
        /// Number of colors in the frame
        actual: usize,
    },

    /// A sync session was requested without any device
    #[error("No devices available")]
    NoDevices,

    /// A previous sync worker is still running and did not exit in time
    #[error("Previous sync session is still shutting down")]
    SessionBusy,

    /// The requested capture backend cannot be used on this system
    #[error("Unsupported capture backend: {0}")]
    UnsupportedBackend(String),

    /// Screen or audio capture failed
    #[error("Capture error: {0}")]
    Capture(String),

    /// Settings could not be loaded or stored
    #[error("Settings error: {0}")]
    Settings(String),

    /// Session event channel closed (controller dropped)
    #[error("Event channel closed")]
    EventsClosed,

    /// Event receiver fell behind and missed messages
    #[error("Event channel error: {0}")]
    ChannelError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 transport decoding error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
