use crate::error::{LightError, Result};
use crate::types::Rgb;

/// Axis-aligned pixel rectangle, `x1`/`y1` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub const fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A captured screen image in packed RGB8, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap packed RGB8 pixels
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height * 3 {
            return Err(LightError::Capture(format!(
                "{}x{} RGB frame needs {} bytes, got {}",
                width,
                height,
                width * height * 3,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Convert packed RGBA8 pixels, dropping alpha
    pub fn from_rgba(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        if data.len() != width * height * 4 {
            return Err(LightError::Capture(format!(
                "{}x{} RGBA frame needs {} bytes, got {}",
                width,
                height,
                width * height * 4,
                data.len()
            )));
        }
        let rgb = data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self { width, height, data: rgb })
    }

    /// Convert packed BGRA8 pixels (common for desktop grabbers)
    pub fn from_bgra(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        if data.len() != width * height * 4 {
            return Err(LightError::Capture(format!(
                "{}x{} BGRA frame needs {} bytes, got {}",
                width,
                height,
                width * height * 4,
                data.len()
            )));
        }
        let rgb = data
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        Ok(Self { width, height, data: rgb })
    }

    /// Frame filled with one color
    pub fn solid(width: usize, height: usize, color: Rgb) -> Self {
        let data = std::iter::repeat(color.channels())
            .take(width * height)
            .flatten()
            .collect();
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`; caller keeps coordinates in bounds
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let i = (y * self.width + x) * 3;
        Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&color.channels());
    }

    /// Paint a rectangle, clipped to the frame
    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let rect = self.clip(rect);
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Intersect a rectangle with the frame bounds
    pub fn clip(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x0.min(self.width),
            rect.y0.min(self.height),
            rect.x1.min(self.width),
            rect.y1.min(self.height),
        )
    }

    /// Iterate the pixels of a (clipped) region in row-major order
    pub fn region(&self, rect: Rect) -> impl Iterator<Item = Rgb> + '_ {
        let rect = self.clip(rect);
        (rect.y0..rect.y1).flat_map(move |y| (rect.x0..rect.x1).map(move |x| self.pixel(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_and_bgra_conversion() {
        let rgba = [10, 20, 30, 255, 40, 50, 60, 0];
        let frame = Frame::from_rgba(2, 1, &rgba).unwrap();
        assert_eq!(frame.pixel(1, 0), Rgb::new(40, 50, 60));

        let bgra = Frame::from_bgra(2, 1, &rgba).unwrap();
        assert_eq!(bgra.pixel(0, 0), Rgb::new(30, 20, 10));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(Frame::from_rgb(2, 2, vec![0; 11]).is_err());
        assert!(Frame::from_rgba(2, 2, &[0; 12]).is_err());
    }

    #[test]
    fn test_region_is_clipped() {
        let mut frame = Frame::solid(4, 4, Rgb::BLACK);
        frame.fill_rect(Rect::new(2, 2, 10, 10), Rgb::WHITE);
        assert_eq!(frame.region(Rect::new(0, 0, 100, 100)).count(), 16);
        assert_eq!(frame.region(Rect::new(2, 2, 10, 10)).filter(|c| *c == Rgb::WHITE).count(), 4);
    }
}
