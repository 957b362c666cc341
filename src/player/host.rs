use anyhow::Result;

use crate::models::{MediaItemId, NextEpisodeInfo};

/// The host application's side of the playback contract. Implementations
/// are injected once and outlive the session.
pub trait PlaybackHost: Send + Sync {
    /// The current file reached its natural end. Never fires for an
    /// intentional stop, and at most once per session.
    fn playback_ended(&self, item_id: Option<&MediaItemId>);

    /// The user asked to stop playback (stop button or cancel key).
    fn stop_requested(&self);

    /// The user activated the next-episode button in the transport bar.
    fn next_episode_requested(&self, info: &NextEpisodeInfo);

    /// The user activated the next-up banner: tear this session down and
    /// start the successor.
    fn start_next_up(&self, info: &NextEpisodeInfo);
}

/// Platform glue: render-surface binding and display geometry.
pub trait WindowTarget: Send + Sync {
    /// Native window handle the engine renders into. Queried once per
    /// session start; failure aborts the load.
    fn window_handle(&self) -> Result<i64>;

    /// Active display resolution, used as the OSD canvas.
    fn display_size(&self) -> (u32, u32);
}
