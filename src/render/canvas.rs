use std::time::Instant;

use rayon::prelude::*;

use super::Renderer;
use crate::types::{Frame, Point2, Rgb, Texture};

/// Software renderer rasterizing into an RGBA buffer.
#[derive(Debug, Default)]
pub struct CanvasRenderer {
    rgba: Vec<u8>,
    width: u32,
    height: u32,
}

impl CanvasRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.offset(i64::from(x), i64::from(y))?;
        self.rgba.get(idx..idx + 4)?.try_into().ok()
    }

    /// Byte offset of `(x, y)`, or `None` off the canvas.
    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    fn plot(&mut self, x: i32, y: i32, color: Rgb) {
        let Some(idx) = self.offset(x.into(), y.into()) else {
            return;
        };
        if let Some(px) = self.rgba.get_mut(idx..idx + 4) {
            px[..3].copy_from_slice(&color);
            px[3] = 255;
        }
    }

    /// Square brush stamped along a Bresenham walk.
    fn stroke(&mut self, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let step_x = if x < to.0 { 1 } else { -1 };
        let step_y = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        // Even widths lean one pixel towards the bottom right.
        let spread = thickness.max(1) - 1;
        let brush = -(spread / 2)..=(spread - spread / 2);

        loop {
            for oy in brush.clone() {
                for ox in brush.clone() {
                    self.plot(x + ox, y + oy, color);
                }
            }
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += step_x;
            }
            if e2 <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    fn disc(&mut self, center: (i32, i32), radius: i32, color: Rgb) {
        let radius = radius.max(0);
        let (cx, cy) = center;
        for oy in -radius..=radius {
            // Half-width of the row at this height.
            let reach = (0..=radius)
                .rev()
                .find(|ox| ox * ox + oy * oy <= radius * radius)
                .unwrap_or(0);
            for ox in -reach..=reach {
                self.plot(cx + ox, cy + oy, color);
            }
        }
    }

    /// Copies the current canvas into a displayable frame.
    pub fn snapshot(&self) -> Frame {
        Frame {
            rgba: self.rgba.clone(),
            width: self.width,
            height: self.height,
            timestamp: Instant::now(),
        }
    }
}

impl Renderer for CanvasRenderer {
    fn upload_texture(&mut self, texture: &Texture) {
        let len = texture.pixels.len() * 4;
        if self.rgba.len() != len {
            self.rgba = vec![0; len];
        }
        self.width = texture.width;
        self.height = texture.height;

        self.rgba
            .par_chunks_mut(4)
            .zip(texture.pixels.par_iter())
            .for_each(|(dst, src)| {
                dst[..3].copy_from_slice(src);
                dst[3] = 255;
            });
    }

    fn draw_line(&mut self, from: Point2, to: Point2, width: f32, color: Rgb) {
        self.stroke(
            (from.x as i32, from.y as i32),
            (to.x as i32, to.y as i32),
            width.round() as i32,
            color,
        );
    }

    fn draw_point(&mut self, at: Point2, radius: f32, color: Rgb) {
        self.disc(
            (at.x.round() as i32, at.y.round() as i32),
            radius.round() as i32,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resolution;

    fn uploaded(width: u32, height: u32) -> CanvasRenderer {
        let mut canvas = CanvasRenderer::new();
        let mut texture = Texture::new(Resolution::new(width, height));
        texture.pixels[0] = [1, 2, 3];
        canvas.upload_texture(&texture);
        canvas
    }

    #[test]
    fn texture_becomes_opaque_rgba() {
        let canvas = uploaded(3, 2);
        assert_eq!((canvas.width(), canvas.height()), (3, 2));
        assert_eq!(canvas.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(canvas.pixel(2, 1), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(3, 0), None);
    }

    #[test]
    fn two_pixel_line_covers_both_endpoints() {
        let mut canvas = uploaded(10, 10);
        canvas.draw_line(Point2::new(1.0, 1.0), Point2::new(7.0, 1.0), 2.0, [255, 0, 0]);
        for x in 1..=8 {
            assert_eq!(canvas.pixel(x, 1), Some([255, 0, 0, 255]));
            assert_eq!(canvas.pixel(x, 2), Some([255, 0, 0, 255]));
        }
        assert_eq!(canvas.pixel(0, 1), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 1), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(4, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn point_fills_a_disc_and_clips_at_edges() {
        let mut canvas = uploaded(20, 20);
        canvas.draw_point(Point2::new(0.0, 0.0), 8.0, [0, 255, 0]);
        assert_eq!(canvas.pixel(0, 0), Some([0, 255, 0, 255]));
        assert_eq!(canvas.pixel(8, 0), Some([0, 255, 0, 255]));
        assert_eq!(canvas.pixel(6, 6), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn plotting_off_the_canvas_is_ignored() {
        let mut canvas = uploaded(3, 2);
        let before = canvas.snapshot().rgba;

        canvas.plot(-1, 0, [9, 9, 9]);
        canvas.plot(3, 0, [9, 9, 9]);
        canvas.plot(0, 2, [9, 9, 9]);
        canvas.plot(i32::MAX, i32::MIN, [9, 9, 9]);
        assert_eq!(canvas.snapshot().rgba, before);

        canvas.plot(2, 1, [9, 9, 9]);
        assert_eq!(canvas.pixel(2, 1), Some([9, 9, 9, 255]));
        assert_eq!(canvas.offset(2, 1), Some(20));
        assert_eq!(canvas.offset(3, 1), None);
    }

    #[test]
    fn snapshot_matches_canvas() {
        let canvas = uploaded(2, 2);
        let frame = canvas.snapshot();
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(&frame.rgba[..4], &[1, 2, 3, 255]);
        assert_eq!(frame.rgba.len(), 16);
    }
}
