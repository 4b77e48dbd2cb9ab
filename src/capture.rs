use crate::error::{LightError, Result};
use crate::frame::{Frame, Rect};
use crate::types::Rgb;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of screen frames
///
/// Calls may block; the session runs them on the blocking pool. `Ok(None)`
/// means no frame was available this time and the iteration is skipped.
pub trait ScreenCapture: Send + Sync {
    fn grab(&self) -> Result<Option<Frame>>;
}

/// Source of mono audio samples in `[-1, 1]`
pub trait AudioCapture: Send + Sync {
    /// Record `frames` samples at `sample_rate`
    fn record(&self, frames: usize, sample_rate: u32) -> Result<Option<Vec<f32>>>;
}

/// Opens capture providers for a session
///
/// A backend that cannot provide a source reports
/// [`LightError::UnsupportedBackend`], which makes the session fail to start.
pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &str;

    fn open_screen(&self) -> Result<Arc<dyn ScreenCapture>> {
        Err(LightError::UnsupportedBackend(format!(
            "{} has no screen capture",
            self.name()
        )))
    }

    fn open_audio(&self) -> Result<Arc<dyn AudioCapture>> {
        Err(LightError::UnsupportedBackend(format!(
            "{} has no audio capture",
            self.name()
        )))
    }
}

/// Backend generating a moving test pattern and a sine tone
///
/// Used by the demo and handy for driving strips without a real capture
/// stack. Both sources block like real devices do: frames arrive at
/// `frame_rate` and audio takes as long to record as it lasts.
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    pub width: usize,
    pub height: usize,
    pub frame_rate: u32,
    pub tone_hz: f32,
    pub tone_level: f32,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self {
            width: 160,
            height: 90,
            frame_rate: 60,
            tone_hz: 2.0,
            tone_level: 0.12,
        }
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open_screen(&self) -> Result<Arc<dyn ScreenCapture>> {
        Ok(Arc::new(
            TestPattern::new(self.width, self.height).with_frame_rate(self.frame_rate),
        ))
    }

    fn open_audio(&self) -> Result<Arc<dyn AudioCapture>> {
        Ok(Arc::new(SineWave::new(self.tone_hz, self.tone_level).realtime()))
    }
}

/// Quadrants of saturated colors whose hues rotate on every grab
#[derive(Debug)]
pub struct TestPattern {
    width: usize,
    height: usize,
    tick: AtomicU64,
    interval: Duration,
    next_frame: Mutex<Option<Instant>>,
}

impl TestPattern {
    /// Pattern that hands out frames as fast as they are grabbed
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
            tick: AtomicU64::new(0),
            interval: Duration::ZERO,
            next_frame: Mutex::new(None),
        }
    }

    /// Block each grab until the next frame is due; 0 disables pacing
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.interval = match fps {
            0 => Duration::ZERO,
            fps => Duration::from_secs(1) / fps,
        };
        self
    }

    fn wait_for_frame(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Ok(());
        }
        let mut next = self
            .next_frame
            .lock()
            .map_err(|_| LightError::Capture("frame clock poisoned".to_string()))?;
        let now = Instant::now();
        let due = (*next).map_or(now, |at| at.max(now));
        std::thread::sleep(due - now);
        *next = Some(due + self.interval);
        Ok(())
    }

    /// Frame for an explicit tick, without advancing the pattern
    pub fn render(&self, tick: u64) -> Frame {
        let (w, h) = (self.width, self.height);
        let mut frame = Frame::solid(w, h, Rgb::new(40, 40, 40));
        let quadrants = [
            Rect::new(0, 0, w / 2, h / 2),
            Rect::new(w / 2, 0, w, h / 2),
            Rect::new(0, h / 2, w / 2, h),
            Rect::new(w / 2, h / 2, w, h),
        ];
        for (i, quadrant) in quadrants.into_iter().enumerate() {
            let hue = (tick * 3 + i as u64 * 90) % 360;
            // Gray border keeps the quadrant centres as the vibrant picks
            let inner = Rect::new(
                quadrant.x0 + quadrant.width() / 8,
                quadrant.y0 + quadrant.height() / 8,
                quadrant.x1 - quadrant.width() / 8,
                quadrant.y1 - quadrant.height() / 8,
            );
            frame.fill_rect(inner, hue_color(hue as f32));
        }
        frame
    }
}

impl ScreenCapture for TestPattern {
    fn grab(&self) -> Result<Option<Frame>> {
        self.wait_for_frame()?;
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        Ok(Some(self.render(tick)))
    }
}

/// Sine tone whose level swells slowly, so music mode walks its color bands
#[derive(Debug)]
pub struct SineWave {
    frequency: f32,
    level: f32,
    realtime: bool,
    elapsed: Mutex<f64>,
}

impl SineWave {
    pub fn new(frequency: f32, level: f32) -> Self {
        Self {
            frequency,
            level: level.clamp(0.0, 1.0),
            realtime: false,
            elapsed: Mutex::new(0.0),
        }
    }

    /// Make each `record` take as long as the audio it returns
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }
}

impl AudioCapture for SineWave {
    fn record(&self, frames: usize, sample_rate: u32) -> Result<Option<Vec<f32>>> {
        if sample_rate == 0 {
            return Err(LightError::Capture("sample rate must be non-zero".to_string()));
        }
        let mut elapsed = self
            .elapsed
            .lock()
            .map_err(|_| LightError::Capture("audio state poisoned".to_string()))?;

        let start = *elapsed;
        let step = 1.0 / sample_rate as f64;
        let swell = (0.5 + 0.5 * (start * self.frequency as f64 * std::f64::consts::TAU).sin()) as f32;
        let samples = (0..frames)
            .map(|i| {
                let t = start + i as f64 * step;
                let carrier = (t * 440.0 * std::f64::consts::TAU).sin() as f32;
                carrier * self.level * swell
            })
            .collect();
        *elapsed = start + frames as f64 * step;
        drop(elapsed);

        if self.realtime {
            std::thread::sleep(Duration::from_secs_f64(frames as f64 * step));
        }
        Ok(Some(samples))
    }
}

/// Fully saturated color for a hue in degrees
fn hue_color(hue: f32) -> Rgb {
    let h = (hue.rem_euclid(360.0)) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Rgb::new((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}
