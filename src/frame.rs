use std::convert::Infallible;

use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};

use crate::fonts::Font;

/// Off-screen buffer that widgets compose into before it is swapped onto the
/// display. Pixels are stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl Frame {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![Rgb888::BLACK; (size.width * size.height) as usize],
        }
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(color);
    }

    pub fn draw_text(&mut self, text: &str, font: Font, position: Point, color: Rgb888) {
        // drawing into memory can't fail
        let _ = Text::with_baseline(
            text,
            position,
            MonoTextStyle::new(font, color),
            Baseline::Top,
        )
        .draw(self);
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|i| self.pixels[i])
    }

    /// All pixels with their coordinates, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel<Rgb888>> + '_ {
        let width = self.size.width as usize;
        self.pixels.iter().enumerate().map(move |(i, color)| {
            Pixel(Point::new((i % width) as i32, (i / width) as i32), *color)
        })
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (point.x, point.y);
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({}x{})", self.size.width, self.size.height)
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;

    #[test]
    fn test_fill() {
        let mut frame = Frame::new(Size::new(4, 3));
        frame.fill(Rgb888::RED);
        assert!(frame.pixels().all(|Pixel(_, c)| c == Rgb888::RED));
        assert_eq!(frame.pixel(Point::new(3, 2)), Some(Rgb888::RED));
        assert_eq!(frame.pixel(Point::new(4, 0)), None);
        assert_eq!(frame.pixel(Point::new(0, -1)), None);
    }

    #[test]
    fn test_text_lands_below_position() {
        let font = fonts::load("6x12").unwrap();
        let mut frame = Frame::new(Size::new(64, 64));
        frame.draw_text("88", font, Point::new(10, 20), Rgb888::GREEN);

        let lit: Vec<Point> = frame
            .pixels()
            .filter(|Pixel(_, c)| *c == Rgb888::GREEN)
            .map(|Pixel(p, _)| p)
            .collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|p| p.x >= 10 && p.x < 22));
        assert!(lit.iter().all(|p| p.y >= 20 && p.y < 32));
    }

    #[test]
    fn test_clipping() {
        let font = fonts::load("6x10").unwrap();
        let mut frame = Frame::new(Size::new(8, 8));
        frame.draw_text("clipped", font, Point::new(4, 4), Rgb888::WHITE);
        assert_eq!(frame.pixels().count(), 64);
    }
}
