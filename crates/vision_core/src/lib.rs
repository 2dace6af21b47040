//! vision_core: shared frame/detection types, detector and frame-source interfaces, overlays.

pub mod interfaces;
pub mod overlay;

pub mod prelude {
    pub use crate::interfaces::*;
    pub use crate::overlay::{annotate, class_color, draw_rect, fill_rect, normalize_box};
}
