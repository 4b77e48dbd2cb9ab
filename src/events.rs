use crate::error::{LightError, Result};
use crate::types::SyncModeKind;
use tokio::sync::broadcast;

/// Lifecycle notification from the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A sync worker started for this many devices
    Started { mode: SyncModeKind, devices: usize },

    /// A sync worker exited after a stop request
    Stopped { mode: SyncModeKind },

    /// A sync worker exited on a fatal error
    Failed { mode: SyncModeKind, reason: String },
}

impl SessionEvent {
    pub fn mode(&self) -> SyncModeKind {
        match self {
            SessionEvent::Started { mode, .. }
            | SessionEvent::Stopped { mode }
            | SessionEvent::Failed { mode, .. } => *mode,
        }
    }
}

/// Receiver for session events
pub struct EventReceiver {
    rx: broadcast::Receiver<SessionEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next session event
    pub async fn recv(&mut self) -> Result<SessionEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => LightError::EventsClosed,
            broadcast::error::RecvError::Lagged(n) => {
                LightError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `None` if no event is pending.
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(LightError::EventsClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(LightError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}
