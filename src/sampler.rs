//! Color extraction from captured frames and audio buffers
//!
//! Everything here is a pure function of its inputs so the sync modes can be
//! exercised with synthetic frames.

use crate::frame::{Frame, Rect};
use crate::types::{Position, Rgb};
use std::collections::VecDeque;

/// Share of each screen dimension sampled around a strategic point
const STRATEGIC_REGION: f64 = 0.10;

/// Thickness of an edge strip, as a share of the screen dimension
const EDGE_STRIP: f64 = 0.10;

/// Thickness of each strip averaged for center-mounted devices
const CENTER_EDGE_STRIP: f64 = 0.05;

/// Amplitude bands for music mode: red below the first, green below the second, blue above
const AMPLITUDE_LOW: f32 = 0.04;
const AMPLITUDE_MID: f32 = 0.08;

/// `saturation * value` in HSV space, both normalized to 0-1
///
/// Bright saturated pixels score high; grays and dark pixels score low.
pub fn vibrance(color: Rgb) -> f32 {
    let r = color.r as f32 / 255.0;
    let g = color.g as f32 / 255.0;
    let b = color.b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let saturation = if max != 0.0 { (max - min) / max } else { 0.0 };
    saturation * max
}

/// Most vibrant pixel inside `rect`; the first one wins on ties
///
/// An empty region yields [`Rgb::NEUTRAL_GRAY`].
pub fn most_vibrant_in(frame: &Frame, rect: Rect) -> Rgb {
    let mut best: Option<(f32, Rgb)> = None;
    for color in frame.region(rect) {
        let score = vibrance(color);
        match best {
            Some((best_score, _)) if score <= best_score => {}
            _ => best = Some((score, color)),
        }
    }
    best.map(|(_, color)| color).unwrap_or(Rgb::NEUTRAL_GRAY)
}

/// Most vibrant pixel in a `width`×`height` box centered on `(cx, cy)`
pub fn most_vibrant_around(frame: &Frame, cx: usize, cy: usize, width: usize, height: usize) -> Rgb {
    let rect = frame.clip(Rect::new(
        cx.saturating_sub(width / 2),
        cy.saturating_sub(height / 2),
        cx + width / 2,
        cy + height / 2,
    ));
    if rect.is_empty() && cx < frame.width() && cy < frame.height() {
        // Region too small to hold a pixel on tiny frames
        return frame.pixel(cx, cy);
    }
    most_vibrant_in(frame, rect)
}

/// Sample `count` colors for a whole-screen layout
///
/// Up to 4 LEDs use vibrant colors from fixed screen positions; larger
/// strips fall back to a grid of center pixels.
pub fn sample_screen(frame: &Frame, count: usize) -> Vec<Rgb> {
    if count <= 4 {
        sample_strategic(frame, count)
    } else {
        sample_grid(frame, count)
    }
}

/// Relative (percent) sample points for small LED counts
fn strategic_positions(count: usize) -> &'static [(u32, u32)] {
    match count {
        0 => &[],
        1 => &[(50, 50)],
        2 => &[(25, 50), (75, 50)],
        3 => &[(25, 25), (75, 25), (50, 75)],
        _ => &[(20, 20), (80, 20), (20, 80), (80, 80)],
    }
}

/// Vibrant color around fixed screen positions (1-4 LEDs)
///
/// The 4-LED layout returns top-left, top-right, bottom-left, bottom-right.
pub fn sample_strategic(frame: &Frame, count: usize) -> Vec<Rgb> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return vec![Rgb::NEUTRAL_GRAY; count.min(4)];
    }

    let region_w = (width as f64 * STRATEGIC_REGION) as usize;
    let region_h = (height as f64 * STRATEGIC_REGION) as usize;

    strategic_positions(count)
        .iter()
        .map(|&(x_pct, y_pct)| {
            let cx = ((x_pct as f64 / 100.0) * width as f64) as usize;
            let cy = ((y_pct as f64 / 100.0) * height as f64) as usize;
            most_vibrant_around(frame, cx.min(width - 1), cy.min(height - 1), region_w, region_h)
        })
        .collect()
}

/// Grid dimensions `(cols, rows)` used for `count` LEDs
pub fn grid_shape(count: usize) -> (usize, usize) {
    let cols = ((count as f64).sqrt().round() as usize).max(1);
    let rows = count.div_ceil(cols);
    (cols, rows)
}

/// Center pixel of each grid cell, row-major, truncated to `count`
pub fn sample_grid(frame: &Frame, count: usize) -> Vec<Rgb> {
    if count == 0 {
        return Vec::new();
    }
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return vec![Rgb::NEUTRAL_GRAY; count];
    }

    let (cols, rows) = grid_shape(count);
    let cell_w = width as f64 / cols as f64;
    let cell_h = height as f64 / rows as f64;

    let mut colors = Vec::with_capacity(count);
    'rows: for row in 0..rows {
        for col in 0..cols {
            if colors.len() >= count {
                break 'rows;
            }
            let x0 = (col as f64 * cell_w) as usize;
            let x1 = ((col + 1) as f64 * cell_w) as usize;
            let y0 = (row as f64 * cell_h) as usize;
            let y1 = ((row + 1) as f64 * cell_h) as usize;
            let cx = (x0 + (x1 - x0) / 2).min(width - 1);
            let cy = (y0 + (y1 - y0) / 2).min(height - 1);
            colors.push(frame.pixel(cx, cy));
        }
    }
    colors
}

/// Strip of the screen bordering `position`
pub fn edge_strip(frame: &Frame, position: Position, thickness: f64) -> Rect {
    let (width, height) = (frame.width(), frame.height());
    let strip_h = (height as f64 * thickness) as usize;
    let strip_w = (width as f64 * thickness) as usize;
    match position {
        Position::Top => Rect::new(0, 0, width, strip_h),
        Position::Bottom => Rect::new(0, height - strip_h, width, height),
        Position::Left => Rect::new(0, 0, strip_w, height),
        Position::Right => Rect::new(width - strip_w, 0, width, height),
        Position::Center => frame.bounds(),
    }
}

/// Split a strip into `count` segments and take the vibrant color of each
///
/// Segments run left to right when `horizontal`, top to bottom otherwise; the
/// last segment absorbs any remainder.
pub fn segment_strip(frame: &Frame, strip: Rect, count: usize, horizontal: bool) -> Vec<Rgb> {
    if count == 0 {
        return Vec::new();
    }
    let span = if horizontal { strip.width() } else { strip.height() };
    let segment = span / count;

    (0..count)
        .map(|i| {
            let start = i * segment;
            let end = if i + 1 < count { start + segment } else { span };
            let rect = if horizontal {
                Rect::new(strip.x0 + start, strip.y0, strip.x0 + end, strip.y1)
            } else {
                Rect::new(strip.x0, strip.y0 + start, strip.x1, strip.y0 + end)
            };
            most_vibrant_in(frame, rect)
        })
        .collect()
}

/// Ambient colors from the screen edge nearest the device
///
/// Center-mounted devices get the channel-wise average of all four edges.
pub fn sample_edge(frame: &Frame, position: Position, count: usize) -> Vec<Rgb> {
    match position {
        Position::Top | Position::Bottom => {
            segment_strip(frame, edge_strip(frame, position, EDGE_STRIP), count, true)
        }
        Position::Left | Position::Right => {
            segment_strip(frame, edge_strip(frame, position, EDGE_STRIP), count, false)
        }
        Position::Center => sample_all_edges(frame, count),
    }
}

fn sample_all_edges(frame: &Frame, count: usize) -> Vec<Rgb> {
    let (width, height) = (frame.width(), frame.height());
    let thickness = (width.min(height) as f64 * CENTER_EDGE_STRIP) as usize;

    let top = segment_strip(frame, Rect::new(0, 0, width, thickness), count, true);
    let bottom = segment_strip(
        frame,
        Rect::new(0, height.saturating_sub(thickness), width, height),
        count,
        true,
    );
    let left = segment_strip(frame, Rect::new(0, 0, thickness, height), count, false);
    let right = segment_strip(
        frame,
        Rect::new(width.saturating_sub(thickness), 0, width, height),
        count,
        false,
    );

    (0..count)
        .map(|i| {
            let edges = [top[i], bottom[i], left[i], right[i]];
            let avg = |channel: fn(&Rgb) -> u8| {
                (edges.iter().map(|c| channel(c) as u16).sum::<u16>() / 4) as u8
            };
            Rgb::new(avg(|c| c.r), avg(|c| c.g), avg(|c| c.b))
        })
        .collect()
}

/// Named screen areas used by zone mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopHalf,
    BottomHalf,
    LeftHalf,
    RightHalf,
    Full,
}

impl Zone {
    /// Pixel bounds of the zone on a `width`×`height` screen
    ///
    /// Quadrant zones span two thirds of each dimension and overlap in the
    /// middle third.
    pub fn bounds(self, width: usize, height: usize) -> Rect {
        let third_w = width / 3;
        let third_h = height / 3;
        match self {
            Zone::TopLeft => Rect::new(0, 0, third_w * 2, third_h * 2),
            Zone::TopRight => Rect::new(third_w, 0, width, third_h * 2),
            Zone::BottomLeft => Rect::new(0, third_h, third_w * 2, height),
            Zone::BottomRight => Rect::new(third_w, third_h, width, height),
            Zone::TopHalf => Rect::new(0, 0, width, height / 2),
            Zone::BottomHalf => Rect::new(0, height / 2, width, height),
            Zone::LeftHalf => Rect::new(0, 0, width / 2, height),
            Zone::RightHalf => Rect::new(width / 2, 0, width, height),
            Zone::Full => Rect::new(0, 0, width, height),
        }
    }

    /// Zones sampled, in LED order, for a device at `position`
    pub fn for_position(position: Position) -> [Zone; 4] {
        match position {
            Position::Top => [Zone::TopLeft, Zone::TopLeft, Zone::TopRight, Zone::TopRight],
            Position::Bottom => [
                Zone::BottomLeft,
                Zone::BottomLeft,
                Zone::BottomRight,
                Zone::BottomRight,
            ],
            Position::Left => [Zone::TopLeft, Zone::LeftHalf, Zone::BottomLeft, Zone::LeftHalf],
            Position::Right => [
                Zone::TopRight,
                Zone::RightHalf,
                Zone::BottomRight,
                Zone::RightHalf,
            ],
            Position::Center => [
                Zone::TopLeft,
                Zone::TopRight,
                Zone::BottomLeft,
                Zone::BottomRight,
            ],
        }
    }
}

/// One vibrant color per zone for the device's position, gray-padded to `count`
pub fn sample_zone(frame: &Frame, position: Position, count: usize) -> Vec<Rgb> {
    let (width, height) = (frame.width(), frame.height());
    let mut colors: Vec<Rgb> = Zone::for_position(position)
        .iter()
        .take(count)
        .map(|zone| most_vibrant_in(frame, zone.bounds(width, height)))
        .collect();
    colors.resize(count, Rgb::NEUTRAL_GRAY);
    colors
}

/// Scale every channel by `factor` (clamped to 0-1), truncating
pub fn apply_brightness(colors: &[Rgb], factor: f64) -> Vec<Rgb> {
    let factor = factor.clamp(0.0, 1.0);
    let scale = |c: u8| (c as f64 * factor) as u8;
    colors
        .iter()
        .map(|c| Rgb::new(scale(c.r), scale(c.g), scale(c.b)))
        .collect()
}

/// Mean grayscale value of the frame, 0-1
pub fn screen_brightness(frame: &Frame) -> f64 {
    let bytes = frame.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let total: u64 = bytes.iter().map(|&b| b as u64).sum();
    total as f64 / bytes.len() as f64 / 255.0
}

/// RMS level of an audio buffer, clamped to 0-1
pub fn amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt();
    if rms.is_finite() {
        rms.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Map an amplitude to a single-channel color
///
/// Quiet levels light red, medium green and loud blue, each scaled by the
/// amplitude itself.
pub fn amplitude_color(amplitude: f32) -> Rgb {
    let amplitude = amplitude.clamp(0.0, 1.0);
    let level = (amplitude * 255.0) as u8;
    if amplitude < AMPLITUDE_LOW {
        Rgb::new(level, 0, 0)
    } else if amplitude < AMPLITUDE_MID {
        Rgb::new(0, level, 0)
    } else {
        Rgb::new(0, 0, level)
    }
}

/// Fixed-length rolling buffer of colors, oldest first
#[derive(Debug, Clone)]
pub struct ColorHistory {
    colors: VecDeque<Rgb>,
    capacity: usize,
}

impl ColorHistory {
    /// History of `capacity` black entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            colors: std::iter::repeat(Rgb::BLACK).take(capacity).collect(),
            capacity,
        }
    }

    /// Append the newest color, dropping the oldest
    pub fn push(&mut self, color: Rgb) {
        self.colors.push_back(color);
        while self.colors.len() > self.capacity {
            self.colors.pop_front();
        }
    }

    /// Newest `count` entries, oldest first, black-padded at the front
    pub fn tail(&self, count: usize) -> Vec<Rgb> {
        let available = self.colors.len().min(count);
        let mut out = vec![Rgb::BLACK; count - available];
        out.extend(self.colors.iter().skip(self.colors.len() - available).copied());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);
    const YELLOW: Rgb = Rgb::new(255, 255, 0);

    fn quadrants(width: usize, height: usize) -> Frame {
        let mut frame = Frame::solid(width, height, Rgb::BLACK);
        frame.fill_rect(Rect::new(0, 0, width / 2, height / 2), RED);
        frame.fill_rect(Rect::new(width / 2, 0, width, height / 2), GREEN);
        frame.fill_rect(Rect::new(0, height / 2, width / 2, height), BLUE);
        frame.fill_rect(Rect::new(width / 2, height / 2, width, height), YELLOW);
        frame
    }

    #[test]
    fn test_vibrance_scores() {
        assert_eq!(vibrance(Rgb::BLACK), 0.0);
        assert_eq!(vibrance(Rgb::WHITE), 0.0);
        assert_eq!(vibrance(Rgb::NEUTRAL_GRAY), 0.0);
        assert_eq!(vibrance(RED), 1.0);
        assert!(vibrance(Rgb::new(128, 0, 0)) < vibrance(RED));
    }

    #[test]
    fn test_saturated_pixel_wins_over_gray() {
        let mut frame = Frame::solid(20, 20, Rgb::new(200, 200, 200));
        frame.set_pixel(13, 7, Rgb::new(250, 20, 180));
        assert_eq!(most_vibrant_in(&frame, frame.bounds()), Rgb::new(250, 20, 180));
    }

    #[test]
    fn test_first_pixel_wins_ties() {
        let mut frame = Frame::solid(4, 1, Rgb::BLACK);
        frame.set_pixel(1, 0, RED);
        frame.set_pixel(3, 0, GREEN);
        assert_eq!(most_vibrant_in(&frame, frame.bounds()), RED);
    }

    #[test]
    fn test_empty_region_is_gray() {
        let frame = Frame::solid(10, 10, RED);
        assert_eq!(most_vibrant_in(&frame, Rect::new(5, 5, 5, 9)), Rgb::NEUTRAL_GRAY);
    }

    #[test]
    fn test_strategic_four_quadrants() {
        let frame = quadrants(200, 100);
        assert_eq!(sample_screen(&frame, 4), vec![RED, GREEN, BLUE, YELLOW]);
    }

    #[test]
    fn test_strategic_small_counts() {
        let frame = quadrants(200, 100);
        assert_eq!(sample_strategic(&frame, 0), Vec::<Rgb>::new());
        assert_eq!(sample_strategic(&frame, 2).len(), 2);
        // The bottom point straddles blue and yellow; equal scores keep the first pixel
        assert_eq!(sample_strategic(&frame, 3), vec![RED, GREEN, BLUE]);
    }

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(5), (2, 3));
        assert_eq!(grid_shape(7), (3, 3));
        assert_eq!(grid_shape(10), (3, 4));
        assert_eq!(grid_shape(12), (3, 4));
        assert_eq!(grid_shape(16), (4, 4));
    }

    #[test]
    fn test_grid_row_major_and_truncated() {
        let frame = quadrants(200, 100);
        let colors = sample_grid(&frame, 6);
        assert_eq!(colors.len(), 6);
        // 2 columns x 3 rows: left column red/blue, right column green/yellow
        assert_eq!(colors[0], RED);
        assert_eq!(colors[1], GREEN);
        assert_eq!(colors[4], BLUE);
        assert_eq!(colors[5], YELLOW);

        let seven = sample_grid(&frame, 7);
        assert_eq!(seven.len(), 7);
    }

    #[test]
    fn test_edge_top_segments() {
        let frame = quadrants(200, 100);
        assert_eq!(sample_edge(&frame, Position::Top, 2), vec![RED, GREEN]);
        assert_eq!(sample_edge(&frame, Position::Bottom, 2), vec![BLUE, YELLOW]);
    }

    #[test]
    fn test_edge_side_segments() {
        let frame = quadrants(200, 100);
        assert_eq!(sample_edge(&frame, Position::Left, 2), vec![RED, BLUE]);
        assert_eq!(sample_edge(&frame, Position::Right, 2), vec![GREEN, YELLOW]);
        assert_eq!(sample_edge(&frame, Position::Right, 5).len(), 5);
    }

    #[test]
    fn test_edge_center_averages_all_strips() {
        let frame = Frame::solid(100, 100, Rgb::new(200, 40, 0));
        let colors = sample_edge(&frame, Position::Center, 3);
        assert_eq!(colors, vec![Rgb::new(200, 40, 0); 3]);
    }

    #[test]
    fn test_zone_pads_with_gray() {
        let frame = quadrants(300, 300);
        let colors = sample_zone(&frame, Position::Center, 6);
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[0], RED);
        assert_eq!(colors[4], Rgb::NEUTRAL_GRAY);
        assert_eq!(colors[5], Rgb::NEUTRAL_GRAY);
        assert_eq!(sample_zone(&frame, Position::Top, 2), vec![RED, RED]);
    }

    #[test]
    fn test_zone_bounds_overlap_middle_third() {
        let rect = Zone::TopRight.bounds(300, 300);
        assert_eq!(rect, Rect::new(100, 0, 300, 200));
        assert_eq!(Zone::RightHalf.bounds(300, 300), Rect::new(150, 0, 300, 300));
    }

    #[test]
    fn test_brightness_scaling_truncates() {
        let scaled = apply_brightness(&[Rgb::new(255, 100, 3)], 0.5);
        assert_eq!(scaled, vec![Rgb::new(127, 50, 1)]);
        assert_eq!(apply_brightness(&[RED], 2.0), vec![RED]);
    }

    #[test]
    fn test_screen_brightness() {
        assert_eq!(screen_brightness(&Frame::solid(4, 4, Rgb::WHITE)), 1.0);
        assert_eq!(screen_brightness(&Frame::solid(4, 4, Rgb::BLACK)), 0.0);
        let half = screen_brightness(&Frame::solid(4, 4, Rgb::new(255, 0, 0)));
        assert!((half - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_amplitude_bands() {
        assert_eq!(amplitude_color(0.02), Rgb::new(5, 0, 0));
        assert_eq!(amplitude_color(0.04), Rgb::new(0, 10, 0));
        assert_eq!(amplitude_color(0.079), Rgb::new(0, 20, 0));
        assert_eq!(amplitude_color(0.08), Rgb::new(0, 0, 20));
        assert_eq!(amplitude_color(1.5), Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_amplitude_rms() {
        assert_eq!(amplitude(&[]), 0.0);
        assert!((amplitude(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(amplitude(&[4.0, -4.0]), 1.0);
    }

    #[test]
    fn test_history_rolls() {
        let mut history = ColorHistory::new(3);
        history.push(RED);
        history.push(GREEN);
        assert_eq!(history.tail(3), vec![Rgb::BLACK, RED, GREEN]);
        history.push(BLUE);
        history.push(YELLOW);
        assert_eq!(history.tail(3), vec![GREEN, BLUE, YELLOW]);
        assert_eq!(history.tail(2), vec![BLUE, YELLOW]);
        assert_eq!(history.tail(5), vec![Rgb::BLACK, Rgb::BLACK, GREEN, BLUE, YELLOW]);
    }
}
