use uuid::Uuid;

use crate::models::MediaItemId;

/// Cached playback state, owned by the controller loop.
///
/// Mutated only on the engine thread; read from anywhere through the
/// synchronized accessors on `PlayerHandle`.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    /// Stamped per `LoadFile`, used for log correlation.
    pub session_id: Option<Uuid>,
    /// None for untracked playback such as a trailer URL.
    pub item_id: Option<MediaItemId>,
    pub playing: bool,
    pub paused: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl PlaybackSession {
    /// Fresh state for a starting session. Playing/paused are cleared so a
    /// stale previous-session event cannot be mistaken for this session's
    /// start; the load path marks `playing` once the engine accepts the file.
    pub fn begin(item_id: Option<MediaItemId>, start_offset_secs: f64) -> Self {
        Self {
            session_id: Some(Uuid::new_v4()),
            item_id,
            playing: false,
            paused: false,
            position_secs: start_offset_secs,
            duration_secs: 0.0,
        }
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.duration_secs - self.position_secs).max(0.0)
    }
}
