pub mod image;
pub mod markup;
pub mod overlay;
pub mod seek;

pub use overlay::{BarFocus, OverlayKey, OverlayMode, PlaybackOverlay};
pub use seek::{SeekAccel, SeekDirection};
