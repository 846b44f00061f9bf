mod canvas;

pub use canvas::CanvasRenderer;

use crate::types::{Point2, Rgb, ScreenPrimitive, Texture};

/// Drawing surface fed once per tick: the texture first, then the overlay.
pub trait Renderer {
    fn upload_texture(&mut self, texture: &Texture);

    fn draw_line(&mut self, from: Point2, to: Point2, width: f32, color: Rgb);

    fn draw_point(&mut self, at: Point2, radius: f32, color: Rgb);
}

pub fn draw_primitives<R>(renderer: &mut R, primitives: &[ScreenPrimitive])
where
    R: Renderer + ?Sized,
{
    for primitive in primitives {
        match *primitive {
            ScreenPrimitive::Line {
                from,
                to,
                width,
                color,
            } => renderer.draw_line(from, to, width, color),
            ScreenPrimitive::Point { at, radius, color } => renderer.draw_point(at, radius, color),
        }
    }
}
