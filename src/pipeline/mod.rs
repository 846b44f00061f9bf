pub mod compositor;
pub mod depth;
pub mod skeleton;

pub use compositor::TextureCompositor;
pub use depth::{DepthHistogram, DepthNormalizer};
pub use skeleton::{PALETTE, build_overlay, slot_color};
