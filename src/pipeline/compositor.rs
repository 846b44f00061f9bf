use crate::types::{ColorFrame, IntensityMap, Resolution, Texture};

/// Owns the session canvas and repaints it from scratch every frame.
#[derive(Debug)]
pub struct TextureCompositor {
    canvas: Texture,
    clip_reported: bool,
}

impl TextureCompositor {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            canvas: Texture::new(resolution),
            clip_reported: false,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.canvas.width, self.canvas.height)
    }

    pub fn texture(&self) -> &Texture {
        &self.canvas
    }

    /// Clears the canvas, then copies the frame's valid region at its offset.
    pub fn composite(&mut self, color: &ColorFrame) -> &Texture {
        self.canvas.clear();

        let canvas_width = self.canvas.width as usize;
        let x0 = color.x_offset() as usize;
        let y0 = color.y_offset() as usize;
        let visible_width = (color.width() as usize).min(canvas_width.saturating_sub(x0));
        let visible_height =
            (color.height() as usize).min((self.canvas.height as usize).saturating_sub(y0));

        if (visible_width < color.width() as usize || visible_height < color.height() as usize)
            && !self.clip_reported
        {
            log::warn!(
                "color region {}x{}+{}+{} clipped to canvas {}",
                color.width(),
                color.height(),
                x0,
                y0,
                self.resolution()
            );
            self.clip_reported = true;
        }
        if visible_width == 0 || visible_height == 0 {
            return &self.canvas;
        }

        for y in 0..visible_height {
            let src = &color.row(y as u32)[..visible_width];
            let start = (y0 + y) * canvas_width + x0;
            self.canvas.pixels[start..start + visible_width].copy_from_slice(src);
        }

        &self.canvas
    }

    /// Clears the canvas, then paints the intensity map as gray.
    pub fn composite_intensity(&mut self, map: &IntensityMap) -> &Texture {
        self.canvas.clear();

        let canvas_width = self.canvas.width as usize;
        let visible_width = (map.width as usize).min(canvas_width);
        let visible_height = (map.height as usize).min(self.canvas.height as usize);

        for y in 0..visible_height {
            let src = &map.values[y * map.width as usize..][..visible_width];
            let dst = &mut self.canvas.pixels[y * canvas_width..][..visible_width];
            for (px, &value) in dst.iter_mut().zip(src) {
                *px = [value, value, value];
            }
        }

        &self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_region_leaves_the_rest_black() {
        let mut compositor = TextureCompositor::new(Resolution::new(6, 5));
        let color = ColorFrame::cropped(
            Resolution::new(6, 5),
            3,
            2,
            2,
            2,
            vec![[10, 20, 30], [40, 50, 60], [70, 80, 90], [1, 2, 3]],
        )
        .unwrap();

        let texture = compositor.composite(&color);

        assert_eq!(texture.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(texture.pixel(4, 2), Some([40, 50, 60]));
        assert_eq!(texture.pixel(3, 3), Some([70, 80, 90]));
        assert_eq!(texture.pixel(4, 3), Some([1, 2, 3]));

        let written = [(3, 2), (4, 2), (3, 3), (4, 3)];
        for y in 0..5 {
            for x in 0..6 {
                if !written.contains(&(x, y)) {
                    assert_eq!(texture.pixel(x, y), Some([0, 0, 0]), "({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn previous_frame_is_cleared() {
        let full = Resolution::new(4, 4);
        let mut compositor = TextureCompositor::new(full);
        compositor.composite(&ColorFrame::new(full, vec![[255, 255, 255]; 16]).unwrap());

        let small = ColorFrame::cropped(full, 0, 0, 1, 1, vec![[9, 9, 9]]).unwrap();
        let texture = compositor.composite(&small);

        assert_eq!(texture.pixel(0, 0), Some([9, 9, 9]));
        assert_eq!(texture.pixels.iter().filter(|p| **p == [0, 0, 0]).count(), 15);
    }

    #[test]
    fn oversized_frame_is_clipped() {
        let mut compositor = TextureCompositor::new(Resolution::new(2, 2));
        let color = ColorFrame::cropped(
            Resolution::new(4, 4),
            1,
            1,
            3,
            3,
            vec![[7, 7, 7]; 9],
        )
        .unwrap();

        let texture = compositor.composite(&color);
        assert_eq!(texture.pixel(1, 1), Some([7, 7, 7]));
        assert_eq!(texture.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(texture.pixels.len(), 4);
    }

    #[test]
    fn region_past_the_canvas_leaves_it_black() {
        let mut compositor = TextureCompositor::new(Resolution::new(2, 2));

        let right = ColorFrame::cropped(Resolution::new(8, 8), 5, 1, 1, 1, vec![[7, 7, 7]]).unwrap();
        let texture = compositor.composite(&right);
        assert_eq!(texture.pixels, vec![[0, 0, 0]; 4]);

        let below = ColorFrame::cropped(Resolution::new(8, 8), 0, 6, 2, 1, vec![[7, 7, 7]; 2]).unwrap();
        let texture = compositor.composite(&below);
        assert_eq!(texture.pixels, vec![[0, 0, 0]; 4]);
    }

    #[test]
    fn intensity_is_painted_gray() {
        let mut compositor = TextureCompositor::new(Resolution::new(2, 1));
        let map = IntensityMap {
            width: 2,
            height: 1,
            values: vec![0, 200],
            valid_pixels: 1,
        };
        let texture = compositor.composite_intensity(&map);
        assert_eq!(texture.pixels, vec![[0, 0, 0], [200, 200, 200]]);
    }
}
