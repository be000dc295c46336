//! RGBA drawing surface
//!
//! A plain in-memory raster. All drawing primitives clip against the
//! bounds, so callers may pass any coordinates.

use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

use crate::vision::landmarks::{HandLandmarks, Point, HAND_LANDMARK_COUNT, HAND_SKELETON};

// ============================================================================
// COLORS AND BRUSHES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(ColorError(hex.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| ColorError(hex.to_string()))
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if digits.len() == 8 { channel(6)? } else { 255 },
        })
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl std::str::FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Invalid color: {0}")]
pub struct ColorError(pub String);

/// Selectable drawing colors
pub const DEFAULT_PALETTE: [Color; 5] = [
    Color::BLACK,
    Color::RED,
    Color::GREEN,
    Color::BLUE,
    Color::YELLOW,
];

/// Selectable line widths in pixels
pub const BRUSH_SIZES: [u32; 3] = [4, 8, 16];

pub const DEFAULT_BRUSH: u32 = 8;

/// Eraser line width; the erased disc has half this radius
pub const ERASER_WIDTH: u32 = 30;

// ============================================================================
// CANVAS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: Color,
    pixels: Vec<Color>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Reset every pixel to the background color
    pub fn clear(&mut self) {
        self.pixels.fill(self.background);
    }

    /// Reallocate at a new size; the content is discarded
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![self.background; width as usize * height as usize];
    }

    /// Color at a pixel, or `None` outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Number of pixels that differ from the background
    pub fn painted_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| **p != self.background).count()
    }

    /// Fill a disc. Pixels are covered when their center lies within
    /// `radius`; the pixel under `center` is always covered.
    pub fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        if self.width == 0 || self.height == 0 || !center.x.is_finite() || !center.y.is_finite() {
            return;
        }
        let radius = radius.max(0.0);

        let min_x = (center.x - radius).floor().max(0.0) as i64;
        let min_y = (center.y - radius).floor().max(0.0) as i64;
        let max_x = ((center.x + radius).ceil() as i64).min(self.width as i64 - 1);
        let max_y = ((center.y + radius).ceil() as i64).min(self.height as i64 - 1);

        let r2 = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    let idx = self.index(x as u32, y as u32);
                    self.pixels[idx] = color;
                }
            }
        }

        let (cx, cy) = (center.x.floor(), center.y.floor());
        if cx >= 0.0 && cy >= 0.0 && (cx as u32) < self.width && (cy as u32) < self.height {
            let idx = self.index(cx as u32, cy as u32);
            self.pixels[idx] = color;
        }
    }

    /// Stroke a segment with round caps by stamping discs along it
    ///
    /// The segment is first clipped to the canvas grown by the brush
    /// radius, so far off-canvas endpoints cost no more than an on-canvas
    /// stroke.
    pub fn draw_line(&mut self, from: Point, to: Point, width: u32, color: Color) {
        let radius = width as f32 / 2.0;
        let Some((from, to)) = self.clip_segment(from, to, radius + 1.0) else {
            return;
        };
        let spacing = (radius / 2.0).max(0.5);
        let length = from.distance(&to);
        let steps = (length / spacing).ceil().max(1.0) as usize;

        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let at = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            self.fill_circle(at, radius, color);
        }
    }

    /// Overlay a hand: bones as thin lines, joints as small dots
    pub fn draw_skeleton(&mut self, hand: &HandLandmarks, mirrored: bool, color: Color) {
        let (w, h) = (self.width, self.height);
        for (a, b) in HAND_SKELETON {
            let from = hand.canvas_point(a, w, h, mirrored);
            let to = hand.canvas_point(b, w, h, mirrored);
            self.draw_line(from, to, 2, color);
        }
        for index in 0..HAND_LANDMARK_COUNT {
            self.fill_circle(hand.canvas_point(index, w, h, mirrored), 3.0, color);
        }
    }

    /// Paint a background disc the size of the eraser
    pub fn erase(&mut self, at: Point) {
        let background = self.background;
        self.fill_circle(at, ERASER_WIDTH as f32 / 2.0, background);
    }

    /// Export as binary PPM (P6). Alpha is dropped.
    pub fn write_ppm<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        write!(writer, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            rgb.extend_from_slice(&[p.r, p.g, p.b]);
        }
        writer.write_all(&rgb)?;
        writer.flush()
    }

    /// Liang-Barsky clip against the canvas rectangle grown by `pad` on
    /// every side. `None` when the segment misses it entirely.
    fn clip_segment(&self, from: Point, to: Point, pad: f32) -> Option<(Point, Point)> {
        if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
            return None;
        }

        let (min_x, min_y) = (-pad, -pad);
        let (max_x, max_y) = (self.width as f32 + pad, self.height as f32 + pad);
        let (dx, dy) = (to.x - from.x, to.y - from.y);

        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        for (p, q) in [
            (-dx, from.x - min_x),
            (dx, max_x - from.x),
            (-dy, from.y - min_y),
            (dy, max_y - from.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return None;
            }
        }

        let at = |t: f32| Point::new(from.x + dx * t, from.y + dy * t);
        Some((at(t0), at(t1)))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::from_hex("#ff0000").unwrap(), Color::RED);
        assert_eq!(Color::from_hex("00ff00").unwrap(), Color::GREEN);
        assert_eq!(
            Color::from_hex("#0000ff80").unwrap(),
            Color {
                r: 0,
                g: 0,
                b: 255,
                a: 128
            }
        );
        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
    }

    #[test]
    fn test_hex_output() {
        assert_eq!(Color::YELLOW.to_hex(), "#ffff00");
    }

    #[test]
    fn test_fill_circle_paints_disc() {
        let mut canvas = Canvas::new(20, 20, Color::WHITE);
        canvas.fill_circle(Point::new(10.0, 10.0), 3.0, Color::BLACK);
        assert_eq!(canvas.pixel(10, 10), Some(Color::BLACK));
        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
        // Roughly pi * r^2
        let painted = canvas.painted_pixels();
        assert!((20..=40).contains(&painted), "painted {painted}");
    }

    #[test]
    fn test_drawing_is_clipped() {
        let mut canvas = Canvas::new(10, 10, Color::WHITE);
        canvas.fill_circle(Point::new(-5.0, -5.0), 3.0, Color::BLACK);
        canvas.fill_circle(Point::new(100.0, 4.0), 50.0, Color::BLACK);
        canvas.draw_line(Point::new(-100.0, 5.0), Point::new(100.0, 5.0), 2, Color::RED);
        canvas.fill_circle(Point::new(f32::NAN, 1.0), 2.0, Color::BLACK);
        assert_eq!(canvas.pixel(5, 5), Some(Color::RED));
        assert_eq!(canvas.pixel(10, 5), None);
    }

    #[test]
    fn test_far_endpoint_is_clipped() {
        let mut canvas = Canvas::new(640, 480, Color::WHITE);
        let started = std::time::Instant::now();
        canvas.draw_line(Point::new(320.0, 240.0), Point::new(6.4e7, 240.0), 8, Color::RED);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        for x in 320..640 {
            assert_eq!(canvas.pixel(x, 240), Some(Color::RED), "gap at {x}");
        }
        assert_eq!(canvas.pixel(319 - 8, 240), Some(Color::WHITE));

        // Entirely off-canvas: nothing painted
        let mut canvas = Canvas::new(64, 48, Color::WHITE);
        canvas.draw_line(Point::new(-1.0e6, -50.0), Point::new(1.0e6, -50.0), 8, Color::RED);
        assert_eq!(canvas.painted_pixels(), 0);
    }

    #[test]
    fn test_skeleton_overlay() {
        let points: Vec<crate::vision::Landmark> = (0..HAND_LANDMARK_COUNT)
            .map(|i| crate::vision::Landmark::new(0.1 + i as f32 * 0.04, 0.5, 0.0))
            .collect();
        let hand = HandLandmarks::from_slice(&points).unwrap();

        let mut canvas = Canvas::new(100, 100, Color::WHITE);
        canvas.draw_skeleton(&hand, false, Color::GREEN);
        // Wrist at x = 10, joints along y = 50
        assert_eq!(canvas.pixel(10, 50), Some(Color::GREEN));
        assert_eq!(canvas.pixel(10, 10), Some(Color::WHITE));

        let mut mirrored = Canvas::new(100, 100, Color::WHITE);
        mirrored.draw_skeleton(&hand, true, Color::GREEN);
        assert_eq!(mirrored.pixel(89, 50), Some(Color::GREEN));
    }

    #[test]
    fn test_line_is_continuous() {
        let mut canvas = Canvas::new(100, 20, Color::WHITE);
        canvas.draw_line(Point::new(5.0, 10.0), Point::new(95.0, 10.0), 4, Color::BLUE);
        for x in 5..95 {
            assert_eq!(canvas.pixel(x, 10), Some(Color::BLUE), "gap at {x}");
        }
    }

    #[test]
    fn test_erase_restores_background() {
        let mut canvas = Canvas::new(50, 50, Color::WHITE);
        canvas.fill_circle(Point::new(25.0, 25.0), 5.0, Color::RED);
        canvas.erase(Point::new(25.0, 25.0));
        assert_eq!(canvas.painted_pixels(), 0);
    }

    #[test]
    fn test_clear_and_resize() {
        let mut canvas = Canvas::new(10, 10, Color::WHITE);
        canvas.fill_circle(Point::new(5.0, 5.0), 2.0, Color::BLACK);
        canvas.clear();
        assert_eq!(canvas.painted_pixels(), 0);

        canvas.fill_circle(Point::new(5.0, 5.0), 2.0, Color::BLACK);
        canvas.resize(4, 3);
        assert_eq!((canvas.width(), canvas.height()), (4, 3));
        assert_eq!(canvas.painted_pixels(), 0);
        assert_eq!(canvas.pixel(3, 2), Some(Color::WHITE));
    }

    #[test]
    fn test_write_ppm() {
        let mut canvas = Canvas::new(2, 1, Color::WHITE);
        canvas.fill_circle(Point::new(0.5, 0.5), 0.1, Color::RED);

        let mut out = Vec::new();
        canvas.write_ppm(&mut out).unwrap();

        let header = b"P6\n2 1\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[255, 0, 0, 255, 255, 255]);
    }
}
