// Tunables for the playback loop and the on-screen display.
// OSD slot numbers are fixed: the overlay code is the only writer of each slot.

use std::time::Duration;

// === Command executor ===
pub const COMMAND_QUEUE_CAPACITY: usize = 64;
pub const POLL_INTERVAL: Duration = Duration::from_millis(30);

// === OSD overlay slots ===
pub const OSD_SLOT_MAIN: u64 = 1;
pub const OSD_SLOT_CLOCK: u64 = 2;
pub const OSD_SLOT_PAUSED_STATUS: u64 = 3;
pub const IMAGE_SLOT_NEXT_UP: u64 = 0;

// === Seek acceleration ===
pub const SEEK_STEPS_SECS: [f64; 5] = [10.0, 30.0, 60.0, 300.0, 600.0];
pub const SEEK_ACCEL_WINDOW: Duration = Duration::from_secs(1);

// === Next-episode banner ===
pub const NEXT_UP_THRESHOLD_SECS: f64 = 60.0;
pub const NEXT_UP_THUMB_BASE_WIDTH: u32 = 320;

// === OSD scaling baselines ===
pub const BASELINE_CANVAS_W: u32 = 1920;
pub const BASELINE_CANVAS_H: u32 = 1080;
pub const PROGRESS_COLUMNS_BASE: usize = 60;
pub const MIN_PROGRESS_COLUMNS: usize = 24;

// Base font sizes at 1080p, scaled by canvas height at render time
pub const FONT_BASE_BAR: u32 = 32;
pub const FONT_BASE_PANEL: u32 = 30;
pub const FONT_BASE_BANNER: u32 = 34;
pub const FONT_BASE_CLOCK: u32 = 28;
pub const FONT_BASE_STATUS: u32 = 26;
