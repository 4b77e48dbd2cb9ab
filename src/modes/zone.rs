use super::{grab_screen, log_frame, SyncContext, Tick, TickError};
use crate::capture::ScreenCapture;
use crate::sampler;
use crate::types::SyncModeKind;
use std::sync::Arc;

/// One color per named screen zone around each strip's position
pub struct ZoneSync {
    screen: Arc<dyn ScreenCapture>,
    frames: u64,
}

impl ZoneSync {
    pub fn new(screen: Arc<dyn ScreenCapture>) -> Self {
        Self { screen, frames: 0 }
    }

    pub(crate) async fn tick(&mut self, ctx: &SyncContext) -> Result<Tick, TickError> {
        let Some(frame) = grab_screen(&self.screen).await? else {
            return Ok(Tick::Idle);
        };

        let params = ctx.params();
        let frames: Vec<_> = ctx
            .devices
            .iter()
            .map(|device| {
                sampler::apply_brightness(
                    &sampler::sample_zone(&frame, device.position, device.leds()),
                    params.brightness_for(SyncModeKind::Zone, device),
                )
            })
            .collect();

        let failures = ctx.send_all(&frames).await;
        self.frames += 1;
        log_frame(SyncModeKind::Zone, self.frames, ctx.devices.len(), failures);
        Ok(Tick::Sent)
    }
}
