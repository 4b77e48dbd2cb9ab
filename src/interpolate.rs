use crate::link::DeviceLink;
use crate::types::{DeviceDescriptor, Rgb};
use std::time::Duration;

/// Linear per-channel blend, truncated toward zero
///
/// The sequences are zipped, so the result has the shorter length.
pub fn blend(start: &[Rgb], end: &[Rgb], t: f64) -> Vec<Rgb> {
    let t = t.clamp(0.0, 1.0);
    start
        .iter()
        .zip(end)
        .map(|(a, b)| {
            let mix = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * t) as u8;
            Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
        })
        .collect()
}

/// Frame `step` of a `steps`-long transition; step 0 is `start`
pub fn frame_at(start: &[Rgb], end: &[Rgb], step: u32, steps: u32) -> Vec<Rgb> {
    if steps == 0 {
        return blend(start, end, 1.0);
    }
    blend(start, end, step as f64 / steps as f64)
}

/// One device's leg of a transition
#[derive(Debug, Clone)]
pub struct TransitionTarget<'a> {
    pub device: &'a DeviceDescriptor,
    pub start: &'a [Rgb],
    pub end: &'a [Rgb],
}

/// Outcome of a transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionReport {
    pub frames_sent: usize,
    pub failures: usize,
}

/// Smooth transition between two frames over a fixed number of steps
#[derive(Debug, Clone, Copy)]
pub struct Interpolator {
    pub steps: u32,
    pub delay: Duration,
}

impl Interpolator {
    pub fn new(steps: u32, delay: Duration) -> Self {
        Self { steps, delay }
    }

    /// Send `steps` intermediate frames to every target
    ///
    /// Each step sends one frame per device, then sleeps `delay`. Send
    /// failures are counted and logged, never fatal.
    pub async fn run(&self, link: &DeviceLink, targets: &[TransitionTarget<'_>]) -> TransitionReport {
        let mut report = TransitionReport::default();

        for step in 0..self.steps {
            for target in targets {
                let frame = frame_at(target.start, target.end, step, self.steps);
                match link.send_colors(target.device, &frame).await {
                    Ok(()) => report.frames_sent += 1,
                    Err(e) => {
                        report.failures += 1;
                        tracing::warn!("Transition frame to {} failed: {}", target.device, e);
                    }
                }
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_zero_is_start() {
        let start = vec![Rgb::new(10, 200, 30), Rgb::new(0, 0, 0)];
        let end = vec![Rgb::new(250, 0, 30), Rgb::new(255, 255, 255)];
        assert_eq!(frame_at(&start, &end, 0, 3), start);
    }

    #[test]
    fn test_moves_monotonically_toward_end() {
        let start = vec![Rgb::new(10, 200, 30)];
        let end = vec![Rgb::new(250, 0, 30)];
        let steps = 10;

        let frames: Vec<_> = (0..=steps).map(|s| frame_at(&start, &end, s, steps)[0]).collect();
        for pair in frames.windows(2) {
            assert!(pair[1].r >= pair[0].r);
            assert!(pair[1].g <= pair[0].g);
            assert_eq!(pair[1].b, 30);
        }
        assert_eq!(frames[steps as usize], end[0]);
    }

    #[test]
    fn test_blend_truncates_and_zips() {
        let out = blend(&[Rgb::new(0, 0, 0), Rgb::WHITE], &[Rgb::new(255, 3, 1)], 0.5);
        assert_eq!(out, vec![Rgb::new(127, 1, 0)]);
    }

    #[test]
    fn test_blend_clamps_t() {
        let a = [Rgb::new(100, 100, 100)];
        let b = [Rgb::new(200, 0, 50)];
        assert_eq!(blend(&a, &b, -1.0), a.to_vec());
        assert_eq!(blend(&a, &b, 2.0), b.to_vec());
    }
}
