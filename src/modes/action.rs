use super::{grab_screen, log_frame, SyncContext, Tick, TickError};
use crate::capture::ScreenCapture;
use crate::config::ActionConfig;
use crate::interpolate::blend;
use crate::sampler;
use crate::types::{Rgb, SyncModeKind};
use std::sync::Arc;
use std::time::Instant;

/// Where the flash detector is
#[derive(Debug, Clone, PartialEq)]
pub enum ActionState {
    /// Following ambient colors and watching for brightness jumps
    Normal,

    /// Showing a flash until `until`, then fading back to `fallback`
    Flashing {
        until: Instant,
        flash: Vec<Vec<Rgb>>,
        fallback: Vec<Vec<Rgb>>,
    },
}

/// Flash detection state machine
///
/// A jump in mean screen brightness above the threshold shows the most
/// vibrant screen color on every LED, holds it, then fades back to the
/// ambient (edge-sampled) colors captured when the flash started.
#[derive(Debug, Clone)]
pub struct ActionDetector {
    config: ActionConfig,
    baseline: f64,
    state: ActionState,
}

impl ActionDetector {
    pub fn new(config: ActionConfig) -> Self {
        Self {
            baseline: config.initial_baseline,
            config,
            state: ActionState::Normal,
        }
    }

    pub fn state(&self) -> &ActionState {
        &self.state
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Produce the frames for one iteration
    ///
    /// `leds` holds each device's LED count. `flash` yields the flash color
    /// and `ambient` the per-device ambient frames; both are only invoked when
    /// the state needs them.
    pub fn advance<F, A>(
        &mut self,
        now: Instant,
        brightness: f64,
        leds: &[usize],
        flash: F,
        ambient: A,
    ) -> Vec<Vec<Rgb>>
    where
        F: FnOnce() -> Rgb,
        A: FnOnce() -> Vec<Vec<Rgb>>,
    {
        if let ActionState::Flashing {
            until,
            flash: held,
            fallback,
        } = &self.state
        {
            let remaining = until.saturating_duration_since(now);
            if !remaining.is_zero() {
                let fade = self.config.fade();
                if remaining > fade {
                    return held.clone();
                }
                let progress = 1.0 - remaining.as_secs_f64() / fade.as_secs_f64();
                return held
                    .iter()
                    .zip(fallback)
                    .map(|(from, to)| blend(from, to, progress))
                    .collect();
            }
            self.state = ActionState::Normal;
        }

        let delta = brightness - self.baseline;
        if delta > self.config.flash_threshold {
            tracing::info!("Flash detected, brightness delta {:.2}", delta);
            let color = flash();
            let frames: Vec<Vec<Rgb>> = leds.iter().map(|&n| vec![color; n]).collect();
            self.state = ActionState::Flashing {
                until: now + self.config.flash_duration(),
                flash: frames.clone(),
                fallback: ambient(),
            };
            return frames;
        }

        // The baseline only follows frames that did not flash
        self.baseline = brightness;
        ambient()
    }
}

/// Flashes the strips on sudden bright screen events
pub struct ActionSync {
    screen: Arc<dyn ScreenCapture>,
    detector: ActionDetector,
    frames: u64,
}

impl ActionSync {
    pub fn new(screen: Arc<dyn ScreenCapture>, config: ActionConfig) -> Self {
        Self {
            screen,
            detector: ActionDetector::new(config),
            frames: 0,
        }
    }

    pub(crate) async fn tick(&mut self, ctx: &SyncContext) -> Result<Tick, TickError> {
        let Some(frame) = grab_screen(&self.screen).await? else {
            return Ok(Tick::Idle);
        };

        let brightness = sampler::screen_brightness(&frame);
        let leds: Vec<usize> = ctx.devices.iter().map(|d| d.leds()).collect();
        let generated = self.detector.advance(
            Instant::now(),
            brightness,
            &leds,
            || sampler::most_vibrant_in(&frame, frame.bounds()),
            || {
                ctx.devices
                    .iter()
                    .map(|d| sampler::sample_edge(&frame, d.position, d.leds()))
                    .collect()
            },
        );

        let params = ctx.params();
        let frames: Vec<_> = ctx
            .devices
            .iter()
            .zip(&generated)
            .map(|(device, colors)| {
                sampler::apply_brightness(colors, params.brightness_for(SyncModeKind::Action, device))
            })
            .collect();

        let failures = ctx.send_all(&frames).await;
        self.frames += 1;
        log_frame(SyncModeKind::Action, self.frames, ctx.devices.len(), failures);
        Ok(Tick::Sent)
    }
}
