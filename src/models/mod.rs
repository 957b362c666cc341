pub mod identifiers;

pub use identifiers::{MediaItemId, SeasonId, SeriesId};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// A subtitle or audio track as reported by the engine's live track table.
/// Always rebuilt from the engine when a picker opens, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub kind: TrackKind,
    pub title: Option<String>,
    pub language: Option<String>,
    pub codec: Option<String>,
    pub selected: bool,
    pub default: bool,
    pub forced: bool,
    pub external: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Subtitle,
    Audio,
}

impl TrackKind {
    /// The `track-list/N/type` value the engine reports for this kind.
    pub fn engine_type(&self) -> &'static str {
        match self {
            TrackKind::Subtitle => "sub",
            TrackKind::Audio => "audio",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrackKind::Subtitle => "Subtitles",
            TrackKind::Audio => "Audio",
        }
    }
}

impl Track {
    /// Human-readable label for the track picker.
    pub fn display_label(&self) -> String {
        let mut label = match (&self.title, &self.language) {
            (Some(title), _) => title.clone(),
            (None, Some(lang)) => format!("Track {} ({})", self.id, lang),
            (None, None) => format!("Track {}", self.id),
        };
        if self.title.is_some()
            && let Some(lang) = &self.language
        {
            label.push_str(&format!(" [{}]", lang));
        }
        if let Some(codec) = &self.codec {
            label.push_str(&format!(" · {}", codec.to_uppercase()));
        }
        if self.default {
            label.push_str(" (default)");
        }
        if self.forced {
            label.push_str(" (forced)");
        }
        if self.external {
            label.push_str(" (external)");
        }
        label
    }
}

/// Resolved successor episode, published by the prefetch pipeline and
/// rendered by the overlay as tooltip and next-up banner content.
#[derive(Debug, Clone)]
pub struct NextEpisodeInfo {
    pub item_id: MediaItemId,
    pub title: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub thumb: Option<PreparedThumb>,
}

/// A converted raw-overlay thumbnail. The temp file is deleted when the
/// last clone of the owning session's slot is dropped.
#[derive(Debug, Clone)]
pub struct PreparedThumb {
    pub file: Arc<NamedTempFile>,
    pub width: u32,
    pub height: u32,
}

impl PreparedThumb {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
