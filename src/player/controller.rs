//! The command executor: sole owner of the engine handle.
//!
//! All engine access is serialized through a bounded mailbox serviced by one
//! dedicated thread. Commands take priority over event polling, so callers
//! are never starved by a chatty engine; when idle the loop blocks on the
//! mailbox for one short poll interval.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use super::host::{PlaybackHost, WindowTarget};
use super::session::PlaybackSession;
use crate::constants::{COMMAND_QUEUE_CAPACITY, POLL_INTERVAL};
use crate::engine::{EngineError, EngineEvent, MediaEngine, PropertyValue};
use crate::models::{MediaItemId, Track, TrackKind};

const OBSERVED_PROPERTIES: [&str; 3] = ["time-pos", "duration", "pause"];

/// Commands that can be sent to the player controller.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Begin a new session from a source URL.
    LoadFile {
        url: String,
        item_id: Option<MediaItemId>,
        start_offset_secs: f64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Seek relative to the current position.
    Seek {
        delta_secs: f64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Seek to an absolute position.
    SeekAbsolute {
        secs: f64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    TogglePause {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Adjust volume by a delta; responds with the new volume.
    AdjustVolume {
        delta: i64,
        respond_to: oneshot::Sender<Result<f64>>,
    },
    /// Toggle mute; responds with the new mute state.
    ToggleMute {
        respond_to: oneshot::Sender<Result<bool>>,
    },
    CycleSubtitles {
        respond_to: oneshot::Sender<Result<()>>,
    },
    CycleAudio {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Select a subtitle track, or disable subtitles with `None`.
    SetSubtitleTrack {
        id: Option<i64>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    SetAudioTrack {
        id: i64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    Stop {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Snapshot of the engine's live track table for one track kind.
    GetTracks {
        kind: TrackKind,
        respond_to: oneshot::Sender<Result<Vec<Track>>>,
    },
    /// Display transient text for a number of milliseconds.
    ShowText {
        text: String,
        duration_ms: u32,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Set a persistent styled-text overlay at a numbered slot.
    SetPersistentOverlay {
        slot: u64,
        markup: String,
        canvas_w: u32,
        canvas_h: u32,
        respond_to: oneshot::Sender<Result<()>>,
    },
    RemovePersistentOverlay {
        slot: u64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Add a raw BGRA image overlay at pixel coordinates.
    AddImageOverlay {
        slot: u64,
        x: u32,
        y: u32,
        file_path: PathBuf,
        width: u32,
        height: u32,
        respond_to: oneshot::Sender<Result<()>>,
    },
    RemoveImageOverlay {
        slot: u64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Orderly engine teardown; the loop exits after responding.
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Owns the engine handle and processes the command mailbox on a dedicated
/// thread, interleaved with engine event polling.
pub struct PlayerController {
    engine: Box<dyn MediaEngine>,
    receiver: Receiver<PlayerCommand>,
    session: Arc<Mutex<PlaybackSession>>,
    host: Arc<dyn PlaybackHost>,
    window: Arc<dyn WindowTarget>,
}

impl PlayerController {
    /// Moves `engine` onto a new thread and returns the submission handle.
    pub fn spawn(
        engine: Box<dyn MediaEngine>,
        host: Arc<dyn PlaybackHost>,
        window: Arc<dyn WindowTarget>,
    ) -> Result<PlayerHandle> {
        let (sender, receiver) = bounded(COMMAND_QUEUE_CAPACITY);
        let session = Arc::new(Mutex::new(PlaybackSession::default()));

        let controller = PlayerController {
            engine,
            receiver,
            session: session.clone(),
            host,
            window,
        };
        thread::Builder::new()
            .name("player-engine".into())
            .spawn(move || controller.run())
            .context("Failed to spawn player engine thread")?;

        Ok(PlayerHandle { sender, session })
    }

    fn run(mut self) {
        debug!("Player controller loop started");

        for name in OBSERVED_PROPERTIES {
            if let Err(e) = self.engine.observe_property(name) {
                warn!("Failed to observe property {}: {}", name, e);
            }
        }

        loop {
            // Waiting commands always win over event polling.
            match self.receiver.try_recv() {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }

            if let Some(event) = self.engine.poll_event() {
                if !self.handle_event(event) {
                    break;
                }
                continue;
            }

            match self.receiver.recv_timeout(POLL_INTERVAL) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!("Player controller loop terminated");
    }

    /// Returns false when the loop should exit.
    fn handle_command(&mut self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::LoadFile {
                url,
                item_id,
                start_offset_secs,
                respond_to,
            } => {
                let result = self.load_file(&url, item_id, start_offset_secs);
                let _ = respond_to.send(result);
            }
            PlayerCommand::Seek {
                delta_secs,
                respond_to,
            } => {
                trace!("Seeking by {}s", delta_secs);
                let result =
                    self.engine_op(|e| e.command("seek", &[&delta_secs.to_string(), "relative"]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::SeekAbsolute { secs, respond_to } => {
                trace!("Seeking to {}s", secs);
                let result =
                    self.engine_op(|e| e.command("seek", &[&secs.to_string(), "absolute"]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::TogglePause { respond_to } => {
                trace!("Toggling pause");
                let result = self.engine_op(|e| e.command("cycle", &["pause"]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::AdjustVolume { delta, respond_to } => {
                trace!("Adjusting volume by {}", delta);
                let result = self.engine_op(|e| {
                    e.command("add", &["volume", &delta.to_string()])?;
                    e.get_property_f64("volume")
                });
                let _ = respond_to.send(result);
            }
            PlayerCommand::ToggleMute { respond_to } => {
                trace!("Toggling mute");
                let result = self.engine_op(|e| {
                    e.command("cycle", &["mute"])?;
                    e.get_property_bool("mute")
                });
                let _ = respond_to.send(result);
            }
            PlayerCommand::CycleSubtitles { respond_to } => {
                let result = self.engine_op(|e| e.command("cycle", &["sub"]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::CycleAudio { respond_to } => {
                let result = self.engine_op(|e| e.command("cycle", &["audio"]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::SetSubtitleTrack { id, respond_to } => {
                trace!("Setting subtitle track to {:?}", id);
                let result = self.engine_op(|e| match id {
                    Some(id) => e.set_property_i64("sid", id),
                    None => e.set_property_str("sid", "no"),
                });
                let _ = respond_to.send(result);
            }
            PlayerCommand::SetAudioTrack { id, respond_to } => {
                trace!("Setting audio track to {}", id);
                let result = self.engine_op(|e| e.set_property_i64("aid", id));
                let _ = respond_to.send(result);
            }
            PlayerCommand::Stop { respond_to } => {
                // Clear the playing flag first so the resulting end-of-stream
                // event reads as an intentional stop, not a natural finish.
                {
                    let mut session = self.session.lock().unwrap();
                    if let Some(id) = session.session_id {
                        info!(session = %id, "Stopping playback");
                    }
                    session.playing = false;
                }
                let result = self.engine_op(|e| e.command("stop", &[]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::GetTracks { kind, respond_to } => {
                let result = self.query_tracks(kind);
                let _ = respond_to.send(result);
            }
            PlayerCommand::ShowText {
                text,
                duration_ms,
                respond_to,
            } => {
                let result = self
                    .engine_op(|e| e.command("show-text", &[&text, &duration_ms.to_string()]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::SetPersistentOverlay {
                slot,
                markup,
                canvas_w,
                canvas_h,
                respond_to,
            } => {
                let result = self.engine_op(|e| {
                    e.command(
                        "osd-overlay",
                        &[
                            &slot.to_string(),
                            "ass-events",
                            &markup,
                            &canvas_w.to_string(),
                            &canvas_h.to_string(),
                        ],
                    )
                });
                let _ = respond_to.send(result);
            }
            PlayerCommand::RemovePersistentOverlay { slot, respond_to } => {
                let result =
                    self.engine_op(|e| e.command("osd-overlay", &[&slot.to_string(), "none", ""]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::AddImageOverlay {
                slot,
                x,
                y,
                file_path,
                width,
                height,
                respond_to,
            } => {
                let result = self.add_image_overlay(slot, x, y, &file_path, width, height);
                let _ = respond_to.send(result);
            }
            PlayerCommand::RemoveImageOverlay { slot, respond_to } => {
                let result =
                    self.engine_op(|e| e.command("overlay-remove", &[&slot.to_string()]));
                let _ = respond_to.send(result);
            }
            PlayerCommand::Shutdown { respond_to } => {
                info!("Player controller shutting down");
                let _ = respond_to.send(());
                return false;
            }
        }
        true
    }

    fn load_file(
        &mut self,
        url: &str,
        item_id: Option<MediaItemId>,
        start_offset_secs: f64,
    ) -> Result<()> {
        // Commands outrank event polling, so an end-of-stream queued by the
        // previous session can still be pending here. Discard it now; left in
        // the queue it would be observed with the new session already marked
        // playing and end that session instead.
        while let Some(event) = self.engine.poll_event() {
            match event {
                EngineEvent::Shutdown => return Err(EngineError::Shutdown.into()),
                event => trace!("Discarding stale engine event: {:?}", event),
            }
        }

        // Reset cached state before the engine confirms anything, so stale
        // previous-session events cannot be mistaken for this session.
        let session_id = {
            let mut session = self.session.lock().unwrap();
            *session = PlaybackSession::begin(item_id, start_offset_secs);
            session.session_id
        };

        let wid = self
            .window
            .window_handle()
            .context("Window handle unavailable, aborting playback start")?;
        self.engine_op(|e| e.attach_window(wid))?;

        let start_arg = format!("start={}", start_offset_secs);
        let result = self.engine_op(|e| {
            if start_offset_secs > 0.0 {
                e.command("loadfile", &[url, "replace", &start_arg])
            } else {
                e.command("loadfile", &[url, "replace"])
            }
        });
        result?;
        self.engine_op(|e| e.set_property_bool("pause", false))?;

        let mut session = self.session.lock().unwrap();
        session.playing = true;
        if let Some(id) = session_id {
            info!(session = %id, url, "Playback session started");
        }
        Ok(())
    }

    fn add_image_overlay(
        &mut self,
        slot: u64,
        x: u32,
        y: u32,
        file_path: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let path = file_path
            .to_str()
            .ok_or_else(|| anyhow!("Overlay image path is not valid UTF-8"))?
            .to_string();
        let stride = width * 4;
        self.engine_op(|e| {
            e.command(
                "overlay-add",
                &[
                    &slot.to_string(),
                    &x.to_string(),
                    &y.to_string(),
                    &path,
                    "0",
                    "bgra",
                    &width.to_string(),
                    &height.to_string(),
                    &stride.to_string(),
                ],
            )
        })
    }

    /// Live snapshot of the engine's track table, never cached.
    fn query_tracks(&mut self, kind: TrackKind) -> Result<Vec<Track>> {
        let count = self.engine_op(|e| e.get_property_i64("track-list/count"))?;
        let mut tracks = Vec::new();
        for i in 0..count {
            let track_type = match self
                .engine
                .get_property_str(&format!("track-list/{}/type", i))
            {
                Ok(t) => t,
                Err(_) => continue,
            };
            if track_type != kind.engine_type() {
                continue;
            }
            let id = match self.engine.get_property_i64(&format!("track-list/{}/id", i)) {
                Ok(id) => id,
                Err(_) => continue,
            };
            tracks.push(Track {
                id,
                kind,
                title: self
                    .engine
                    .get_property_str(&format!("track-list/{}/title", i))
                    .ok(),
                language: self
                    .engine
                    .get_property_str(&format!("track-list/{}/lang", i))
                    .ok(),
                codec: self
                    .engine
                    .get_property_str(&format!("track-list/{}/codec", i))
                    .ok(),
                selected: self
                    .engine
                    .get_property_bool(&format!("track-list/{}/selected", i))
                    .unwrap_or(false),
                default: self
                    .engine
                    .get_property_bool(&format!("track-list/{}/default", i))
                    .unwrap_or(false),
                forced: self
                    .engine
                    .get_property_bool(&format!("track-list/{}/forced", i))
                    .unwrap_or(false),
                external: self
                    .engine
                    .get_property_bool(&format!("track-list/{}/external", i))
                    .unwrap_or(false),
            });
        }
        Ok(tracks)
    }

    /// Returns false when the loop should exit.
    fn handle_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::PropertyChanged { name, value } => {
                self.apply_property(&name, value);
            }
            EngineEvent::EndOfStream { reason } => {
                trace!("End of stream: {:?}", reason);
                // Only a session still marked playing counts as a natural
                // end; Stop already cleared the flag.
                let ended = {
                    let mut session = self.session.lock().unwrap();
                    if session.playing {
                        session.playing = false;
                        Some(session.item_id.clone())
                    } else {
                        None
                    }
                };
                if let Some(item_id) = ended {
                    info!("Playback ended naturally for {:?}", item_id);
                    self.host.playback_ended(item_id.as_ref());
                }
            }
            EngineEvent::Shutdown => {
                info!("Engine reported shutdown");
                return false;
            }
        }
        true
    }

    fn apply_property(&mut self, name: &str, value: PropertyValue) {
        let mut session = self.session.lock().unwrap();
        match (name, value) {
            ("time-pos", PropertyValue::Double(v)) => session.position_secs = v,
            ("duration", PropertyValue::Double(v)) => session.duration_secs = v,
            ("pause", PropertyValue::Flag(v)) => session.paused = v,
            // Keep the previous cached value when the engine reports the
            // property without a decodable value.
            (_, PropertyValue::Unavailable) => {}
            (name, value) => trace!("Ignoring property change {}={:?}", name, value),
        }
    }

    fn engine_op<T>(
        &mut self,
        op: impl FnOnce(&mut dyn MediaEngine) -> Result<T, EngineError>,
    ) -> Result<T> {
        match op(self.engine.as_mut()) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Engine operation failed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Submission side of the mailbox plus synchronized session accessors.
/// Cheap to clone; the controller thread remains the only engine owner.
#[derive(Clone)]
pub struct PlayerHandle {
    sender: Sender<PlayerCommand>,
    session: Arc<Mutex<PlaybackSession>>,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("queued", &self.sender.len())
            .finish()
    }
}

impl PlayerHandle {
    /// Snapshot of the cached session state.
    pub fn session(&self) -> PlaybackSession {
        self.session.lock().unwrap().clone()
    }

    pub fn position_secs(&self) -> f64 {
        self.session.lock().unwrap().position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.session.lock().unwrap().duration_secs
    }

    pub fn is_paused(&self) -> bool {
        self.session.lock().unwrap().paused
    }

    pub fn is_playing(&self) -> bool {
        self.session.lock().unwrap().playing
    }

    async fn submit<T>(
        &self,
        command: PlayerCommand,
        response: oneshot::Receiver<T>,
    ) -> Result<T> {
        self.sender
            .send(command)
            .map_err(|_| anyhow!("Player controller disconnected"))?;
        response
            .await
            .map_err(|_| anyhow!("Player controller dropped the command"))
    }

    /// Begin a new session. `item_id` is `None` for untracked playback.
    pub async fn load_file(
        &self,
        url: &str,
        item_id: Option<MediaItemId>,
        start_offset_secs: f64,
    ) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::LoadFile {
                url: url.to_string(),
                item_id,
                start_offset_secs,
                respond_to,
            },
            response,
        )
        .await?
    }

    pub async fn seek(&self, delta_secs: f64) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::Seek {
                delta_secs,
                respond_to,
            },
            response,
        )
        .await?
    }

    pub async fn seek_absolute(&self, secs: f64) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::SeekAbsolute { secs, respond_to }, response)
            .await?
    }

    pub async fn toggle_pause(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::TogglePause { respond_to }, response)
            .await?
    }

    /// Returns the new volume.
    pub async fn adjust_volume(&self, delta: i64) -> Result<f64> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::AdjustVolume { delta, respond_to }, response)
            .await?
    }

    /// Returns the new mute state.
    pub async fn toggle_mute(&self) -> Result<bool> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::ToggleMute { respond_to }, response)
            .await?
    }

    pub async fn cycle_subtitles(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::CycleSubtitles { respond_to }, response)
            .await?
    }

    pub async fn cycle_audio(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::CycleAudio { respond_to }, response)
            .await?
    }

    /// Select a subtitle track, or disable subtitles with `None`.
    pub async fn set_subtitle_track(&self, id: Option<i64>) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::SetSubtitleTrack { id, respond_to }, response)
            .await?
    }

    pub async fn set_audio_track(&self, id: i64) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::SetAudioTrack { id, respond_to }, response)
            .await?
    }

    pub async fn stop(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::Stop { respond_to }, response)
            .await?
    }

    pub async fn tracks(&self, kind: TrackKind) -> Result<Vec<Track>> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::GetTracks { kind, respond_to }, response)
            .await?
    }

    pub async fn show_text(&self, text: &str, duration_ms: u32) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::ShowText {
                text: text.to_string(),
                duration_ms,
                respond_to,
            },
            response,
        )
        .await?
    }

    pub async fn set_persistent_overlay(
        &self,
        slot: u64,
        markup: String,
        canvas_w: u32,
        canvas_h: u32,
    ) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::SetPersistentOverlay {
                slot,
                markup,
                canvas_w,
                canvas_h,
                respond_to,
            },
            response,
        )
        .await?
    }

    pub async fn remove_persistent_overlay(&self, slot: u64) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::RemovePersistentOverlay { slot, respond_to },
            response,
        )
        .await?
    }

    pub async fn add_image_overlay(
        &self,
        slot: u64,
        x: u32,
        y: u32,
        file_path: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::AddImageOverlay {
                slot,
                x,
                y,
                file_path: file_path.to_path_buf(),
                width,
                height,
                respond_to,
            },
            response,
        )
        .await?
    }

    pub async fn remove_image_overlay(&self, slot: u64) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(
            PlayerCommand::RemoveImageOverlay { slot, respond_to },
            response,
        )
        .await?
    }

    /// Orderly teardown of the engine thread.
    pub async fn shutdown(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.submit(PlayerCommand::Shutdown { respond_to }, response)
            .await
    }
}
