use crate::utils::error::Result;
use ab_glyph::{point, Font, FontRef, Glyph, GlyphId, PxScale, ScaleFont};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GRID: Rgb<u8> = Rgb([220, 220, 220]);

/// DejaVu Sans, bundled so every plot renders with the same metrics.
static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Anti-aliased coverage of one laid-out string, row-major, 0..=255.
struct TextMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

/// Pixel canvas with a handful of primitives; y grows downward.
pub struct Canvas {
    img: RgbImage,
    font: FontRef<'static>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            img: RgbImage::from_pixel(width, height, WHITE),
            font: FontRef::try_from_slice(FONT_DATA)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.img.get_pixel(x, y)
    }

    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.img.width() && (y as u32) < self.img.height() {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Inclusive on both corners; corners may come in any order.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        for y in ya..=yb {
            for x in xa..=xb {
                self.put(x, y, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        self.line(x0, y0, x1, y0, color);
        self.line(x1, y0, x1, y1, color);
        self.line(x1, y1, x0, y1, color);
        self.line(x0, y1, x0, y0, color);
    }

    /// Bresenham
    pub fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Hollow circle marker of radius `r`.
    pub fn ring(&mut self, cx: i64, cy: i64, r: i64, color: Rgb<u8>) {
        let r2_outer = r * r;
        let r2_inner = (r - 1).max(0) * (r - 1).max(0);
        for y in -r..=r {
            for x in -r..=r {
                let d = x * x + y * y;
                if d <= r2_outer && d >= r2_inner {
                    self.put(cx + x, cy + y, color);
                }
            }
        }
    }

    /// Mixes `color` over the current pixel by `coverage` (0 keeps the background).
    fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, coverage: u8) {
        if coverage == 0 || x < 0 || y < 0 || x as u32 >= self.img.width() || y as u32 >= self.img.height() {
            return;
        }
        let a = f32::from(coverage) / 255.0;
        let bg = *self.img.get_pixel(x as u32, y as u32);
        let mix = |i: usize| (f32::from(color[i]) * a + f32::from(bg[i]) * (1.0 - a)).round() as u8;
        self.img.put_pixel(x as u32, y as u32, Rgb([mix(0), mix(1), mix(2)]));
    }

    /// Glyphs positioned on one line with the baseline at the ascent, plus the advance width.
    fn layout(&self, text: &str, px: f32) -> (Vec<Glyph>, f32) {
        let scale = PxScale::from(px);
        let font = self.font.as_scaled(scale);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut caret = 0.0f32;
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                caret += font.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, font.ascent())));
            caret += font.h_advance(id);
            previous = Some(id);
        }
        (glyphs, caret)
    }

    fn rasterize(&self, text: &str, px: f32) -> TextMask {
        let (glyphs, advance) = self.layout(text, px);
        let width = advance.ceil().max(0.0) as u32;
        let height = self.text_height(px).max(0) as u32;
        let mut alpha = vec![0u8; (width * height) as usize];

        for glyph in glyphs {
            let Some(outline) = self.font.outline_glyph(glyph) else {
                continue; // 空白
            };
            let bounds = outline.px_bounds();
            outline.draw(|x, y, v| {
                let gx = x as i64 + bounds.min.x as i64;
                let gy = y as i64 + bounds.min.y as i64;
                if gx >= 0 && gy >= 0 && (gx as u32) < width && (gy as u32) < height {
                    let idx = (gy as u32 * width + gx as u32) as usize;
                    alpha[idx] = alpha[idx].max((v.clamp(0.0, 1.0) * 255.0).round() as u8);
                }
            });
        }

        TextMask { width, height, alpha }
    }

    /// Advance width in pixels of `text` at `px` pixels per em.
    pub fn text_width(&self, text: &str, px: f32) -> i64 {
        self.layout(text, px).1.ceil() as i64
    }

    /// Line height (ascent to descent) at `px`.
    pub fn text_height(&self, px: f32) -> i64 {
        let font = self.font.as_scaled(PxScale::from(px));
        (font.ascent() - font.descent()).ceil() as i64
    }

    /// Draws `text` with the top-left corner of its line box at `(x, y)`.
    pub fn text(&mut self, x: i64, y: i64, text: &str, px: f32, color: Rgb<u8>) {
        let mask = self.rasterize(text, px);
        for my in 0..mask.height {
            for mx in 0..mask.width {
                let coverage = mask.alpha[(my * mask.width + mx) as usize];
                self.blend(x + mx as i64, y + my as i64, color, coverage);
            }
        }
    }

    pub fn text_centered(&mut self, cx: i64, cy: i64, text: &str, px: f32, color: Rgb<u8>) {
        let w = self.text_width(text, px);
        let h = self.text_height(px);
        self.text(cx - w / 2, cy - h / 2, text, px, color);
    }

    /// Text rotated a quarter turn counter-clockwise (reads bottom to top), centred on `(cx, cy)`.
    pub fn text_vertical_centered(&mut self, cx: i64, cy: i64, text: &str, px: f32, color: Rgb<u8>) {
        let mask = self.rasterize(text, px);
        let x0 = cx - mask.height as i64 / 2;
        let y0 = cy - mask.width as i64 / 2;
        for my in 0..mask.height {
            for mx in 0..mask.width {
                let coverage = mask.alpha[(my * mask.width + mx) as usize];
                // 字頂朝左，行首在下
                self.blend(x0 + my as i64, y0 + (mask.width - 1 - mx) as i64, color, coverage);
            }
        }
    }

    pub fn to_png(self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(self.img).write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Short tick label: integers stay integers, otherwise up to 2 decimals.
pub fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else if value.abs() >= 100.0 {
        format!("{:.0}", value)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Evenly spaced "nice" ticks covering `[lo, hi]`.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() || target == 0 {
        return Vec::new();
    }
    if (hi - lo).abs() < f64::EPSILON {
        return vec![lo];
    }
    let raw = (hi - lo) / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let start = (lo / step).ceil() as i64;
    let end = (hi / step).floor() as i64;
    (start..=end).map(|i| i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 非白色像素的外框 (x0, y0, x1, y1)
    fn ink_bounds(canvas: &Canvas) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.pixel(x, y) != WHITE {
                    bounds = Some(match bounds {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        bounds
    }

    #[test]
    fn test_primitives_stay_in_bounds() {
        let mut canvas = Canvas::new(20, 10).unwrap();
        canvas.line(-5, -5, 30, 30, BLACK);
        canvas.fill_rect(18, 8, 25, 25, BLACK);
        canvas.ring(0, 0, 4, BLACK);

        assert_eq!(canvas.pixel(0, 0), BLACK);
        assert_eq!(canvas.pixel(19, 9), BLACK);
        assert_eq!(canvas.pixel(10, 2), WHITE);
    }

    #[test]
    fn test_text_stays_inside_its_line_box() {
        let mut canvas = Canvas::new(200, 60).unwrap();
        let w = canvas.text_width("Neutral", 20.0);
        let h = canvas.text_height(20.0);
        canvas.text(10, 10, "Neutral", 20.0, BLACK);

        let (x0, y0, x1, y1) = ink_bounds(&canvas).unwrap();
        assert!(x0 >= 10 && y0 >= 10, "ink starts at ({x0}, {y0})");
        assert!((x1 as i64) < 10 + w && (y1 as i64) < 10 + h, "ink ends at ({x1}, {y1})");
        // 反鋸齒會留下灰階像素
        let gray = (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
            .any(|(x, y)| {
                let p = canvas.pixel(x, y);
                p != WHITE && p != BLACK
            });
        assert!(gray);
    }

    #[test]
    fn test_text_metrics() {
        let canvas = Canvas::new(1, 1).unwrap();
        assert_eq!(canvas.text_width("", 14.0), 0);
        assert!(canvas.text_width("10", 14.0) > canvas.text_width("1", 14.0));
        assert!(canvas.text_width("1", 28.0) > canvas.text_width("1", 14.0));
        assert!(canvas.text_height(20.0) >= 20);
    }

    #[test]
    fn test_vertical_text_is_tall() {
        let mut canvas = Canvas::new(60, 200).unwrap();
        canvas.text_vertical_centered(30, 100, "Actual Label", 16.0, BLACK);

        let (x0, y0, x1, y1) = ink_bounds(&canvas).unwrap();
        assert!(y1 - y0 > 3 * (x1 - x0), "ink box ({x0}, {y0}) - ({x1}, {y1})");
        assert!(x0 > 15 && x1 < 45);
    }

    #[test]
    fn test_png_signature() {
        let png = Canvas::new(4, 4).unwrap().to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(nice_ticks(3.0, 3.0, 5), vec![3.0]);
        assert_eq!(format_tick(2.0), "2");
        assert_eq!(format_tick(0.25), "0.25");
        assert_eq!(format_tick(-1.5), "-1.5");
    }
}
