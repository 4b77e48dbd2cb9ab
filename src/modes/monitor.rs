use super::{grab_screen, log_frame, SyncContext, Tick, TickError};
use crate::capture::ScreenCapture;
use crate::interpolate::{Interpolator, TransitionTarget};
use crate::sampler;
use crate::types::{Rgb, SyncModeKind};
use std::sync::Arc;
use std::time::Duration;

/// Mirrors the most vibrant screen colors, with a short smoothing transition
pub struct MonitorSync {
    screen: Arc<dyn ScreenCapture>,
    interpolator: Interpolator,
    previous: Option<Vec<Vec<Rgb>>>,
    frames: u64,
}

impl MonitorSync {
    pub fn new(screen: Arc<dyn ScreenCapture>, steps: u32, delay: Duration) -> Self {
        Self {
            screen,
            interpolator: Interpolator::new(steps, delay),
            previous: None,
            frames: 0,
        }
    }

    pub(crate) async fn tick(&mut self, ctx: &SyncContext) -> Result<Tick, TickError> {
        let Some(frame) = grab_screen(&self.screen).await? else {
            return Ok(Tick::Idle);
        };

        let params = ctx.params();
        let targets: Vec<Vec<Rgb>> = ctx
            .devices
            .iter()
            .map(|device| {
                let colors = params.rotation.apply(sampler::sample_screen(&frame, device.leds()));
                sampler::apply_brightness(
                    &colors,
                    params.brightness_for(SyncModeKind::Monitor, device),
                )
            })
            .collect();

        let failures = match self.previous.as_ref() {
            Some(previous) if previous.len() == targets.len() && self.interpolator.steps > 0 => {
                let legs: Vec<TransitionTarget<'_>> = ctx
                    .devices
                    .iter()
                    .zip(previous.iter().zip(&targets))
                    .map(|(device, (start, end))| TransitionTarget {
                        device,
                        start: start.as_slice(),
                        end: end.as_slice(),
                    })
                    .collect();
                self.interpolator.run(&ctx.link, &legs).await.failures
            }
            _ => ctx.send_all(&targets).await,
        };

        self.frames += 1;
        log_frame(SyncModeKind::Monitor, self.frames, ctx.devices.len(), failures);
        self.previous = Some(targets);
        Ok(Tick::Sent)
    }
}
