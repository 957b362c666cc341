//! Styled-text (ASS override tag) building blocks, resolution scaling and
//! time/progress formatting for the on-screen display.
//!
//! Font sizes scale with canvas height against a 1080p baseline; the
//! progress bar's character count scales with canvas width against 1920,
//! floored at a minimum readable width.

use crate::constants::{
    BASELINE_CANVAS_H, BASELINE_CANVAS_W, MIN_PROGRESS_COLUMNS, PROGRESS_COLUMNS_BASE,
};

pub const COLOR_TEXT: u32 = 0xFFFFFF;
pub const COLOR_ACCENT: u32 = 0x4FC3F7;
pub const COLOR_DIM: u32 = 0x787878;

/// Primary fill color override. ASS stores colors as &HBBGGRR&.
pub fn ass_color(rgb: u32) -> String {
    let r = (rgb >> 16) & 0xFF;
    let g = (rgb >> 8) & 0xFF;
    let b = rgb & 0xFF;
    format!("{{\\1c&H{:02X}{:02X}{:02X}&}}", b, g, r)
}

pub fn ass_font_size(px: u32) -> String {
    format!("{{\\fs{}}}", px)
}

/// Numpad-style alignment anchor (1 = bottom left .. 9 = top right).
pub fn ass_align(anchor: u8) -> String {
    format!("{{\\an{}}}", anchor)
}

pub fn ass_bold(on: bool) -> String {
    format!("{{\\b{}}}", if on { 1 } else { 0 })
}

/// Strips characters that would open or close an override block.
pub fn ass_escape(text: &str) -> String {
    text.chars().filter(|c| *c != '{' && *c != '}').collect()
}

pub fn scaled_font_size(base: u32, canvas_h: u32) -> u32 {
    ((base * canvas_h) / BASELINE_CANVAS_H).max(8)
}

pub fn progress_columns(canvas_w: u32) -> usize {
    let scaled = (PROGRESS_COLUMNS_BASE as u64 * canvas_w as u64) / BASELINE_CANVAS_W as u64;
    (scaled as usize).max(MIN_PROGRESS_COLUMNS)
}

/// A fixed-width textual progress bar.
pub fn progress_bar(position_secs: f64, duration_secs: f64, columns: usize) -> String {
    let fraction = if duration_secs > 0.0 {
        (position_secs / duration_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((fraction * columns as f64).round() as usize).min(columns);
    let mut bar = String::with_capacity(columns * 3);
    for _ in 0..filled {
        bar.push('█');
    }
    for _ in filled..columns {
        bar.push('░');
    }
    bar
}

/// `H:MM:SS` above an hour, `M:SS` below.
pub fn format_timestamp(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
