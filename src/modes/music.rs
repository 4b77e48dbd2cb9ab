use super::{log_frame, SyncContext, Tick, TickError};
use crate::capture::AudioCapture;
use crate::config::AudioConfig;
use crate::error::LightError;
use crate::sampler::{self, ColorHistory};
use crate::types::SyncModeKind;
use std::sync::Arc;

/// Scrolls an amplitude-colored trail across the strips
pub struct MusicSync {
    audio: Arc<dyn AudioCapture>,
    config: AudioConfig,
    history: Option<ColorHistory>,
    frames: u64,
}

impl MusicSync {
    pub fn new(audio: Arc<dyn AudioCapture>, config: AudioConfig) -> Self {
        Self {
            audio,
            config,
            history: None,
            frames: 0,
        }
    }

    async fn record(&self) -> Result<Option<Vec<f32>>, TickError> {
        let audio = Arc::clone(&self.audio);
        let frames = self.config.frames();
        let rate = self.config.sample_rate;
        match tokio::task::spawn_blocking(move || audio.record(frames, rate)).await {
            Ok(result) => result.map_err(TickError::from),
            Err(e) => Err(TickError::Fatal(LightError::Capture(format!(
                "audio capture task failed: {}",
                e
            )))),
        }
    }

    pub(crate) async fn tick(&mut self, ctx: &SyncContext) -> Result<Tick, TickError> {
        let samples = self.record().await?;
        let level = samples.as_deref().map(sampler::amplitude).unwrap_or(0.0);
        let color = sampler::amplitude_color(level);

        let longest = ctx.devices.iter().map(|d| d.leds()).max().unwrap_or(1);
        let history = self.history.get_or_insert_with(|| ColorHistory::new(longest));
        history.push(color);

        let params = ctx.params();
        let frames: Vec<_> = ctx
            .devices
            .iter()
            .map(|device| {
                sampler::apply_brightness(
                    &history.tail(device.leds()),
                    params.brightness_for(SyncModeKind::Music, device),
                )
            })
            .collect();

        let failures = ctx.send_all(&frames).await;
        self.frames += 1;
        if self.frames % 60 == 0 {
            tracing::debug!("Music amplitude {:.3} -> {:?}", level, color);
        }
        log_frame(SyncModeKind::Music, self.frames, ctx.devices.len(), failures);
        Ok(Tick::Sent)
    }
}
