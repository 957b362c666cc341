//! Modal on-screen-display state machine. Owns no playback state itself:
//! it reads and controls the session through the player handle and renders
//! by asking the engine to composite styled text and raw-image overlays.

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::markup::{
    COLOR_ACCENT, COLOR_DIM, COLOR_TEXT, ass_align, ass_bold, ass_color, ass_escape,
    ass_font_size, format_timestamp, progress_bar, progress_columns, scaled_font_size,
};
use super::seek::{SeekAccel, SeekDirection};
use crate::config::Config;
use crate::constants::{
    FONT_BASE_BANNER, FONT_BASE_BAR, FONT_BASE_CLOCK, FONT_BASE_PANEL, FONT_BASE_STATUS,
    IMAGE_SLOT_NEXT_UP, NEXT_UP_THRESHOLD_SECS, OSD_SLOT_CLOCK, OSD_SLOT_MAIN,
    OSD_SLOT_PAUSED_STATUS,
};
use crate::models::{NextEpisodeInfo, TrackKind};
use crate::player::next_up::{Lookahead, NextUpSlot};
use crate::player::session::PlaybackSession;
use crate::player::{PlaybackHost, PlayerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Hidden,
    Bar,
    TrackSelect,
    NextUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarFocus {
    Buttons,
    Progress,
}

/// Input already mapped by the host from remote/keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKey {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Info,
    PlayPause,
    VolumeUp,
    VolumeDown,
    Mute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarButton {
    PlayPause,
    Subtitles,
    Audio,
    NextEpisode,
    Stop,
}

#[derive(Debug)]
struct TrackPanel {
    kind: TrackKind,
    entries: Vec<PanelEntry>,
    cursor: usize,
}

#[derive(Debug, Clone)]
struct PanelEntry {
    /// None is the synthetic "disable subtitles" entry.
    id: Option<i64>,
    label: String,
    active: bool,
}

/// Created when a session starts, destroyed with `close()` when it stops.
pub struct PlaybackOverlay {
    player: PlayerHandle,
    host: Arc<dyn PlaybackHost>,
    next_up: Arc<NextUpSlot>,
    prefetch_cancel: CancellationToken,
    episodic: bool,
    canvas_w: u32,
    canvas_h: u32,
    auto_hide: Duration,
    paused_refresh: Duration,
    volume_step: i64,

    mode: OverlayMode,
    focus: BarFocus,
    button_index: usize,
    seek: SeekAccel,
    panel: Option<TrackPanel>,
    last_activity: Instant,
    last_paused_refresh: Option<Instant>,
    last_rendered_second: Option<i64>,
    minis_visible: bool,
    banner_image_visible: bool,
    banner_triggered: bool,
}

impl PlaybackOverlay {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player: PlayerHandle,
        host: Arc<dyn PlaybackHost>,
        next_up: Arc<NextUpSlot>,
        prefetch_cancel: CancellationToken,
        episodic: bool,
        canvas: (u32, u32),
        config: &Config,
    ) -> Self {
        Self {
            player,
            host,
            next_up,
            prefetch_cancel,
            episodic,
            canvas_w: canvas.0,
            canvas_h: canvas.1,
            auto_hide: Duration::from_secs(config.osd.auto_hide_secs),
            paused_refresh: Duration::from_millis(config.osd.paused_refresh_ms),
            volume_step: config.playback.volume_step,
            mode: OverlayMode::Hidden,
            focus: BarFocus::Buttons,
            button_index: 0,
            seek: SeekAccel::new(),
            panel: None,
            last_activity: Instant::now(),
            last_paused_refresh: None,
            last_rendered_second: None,
            minis_visible: false,
            banner_image_visible: false,
            banner_triggered: false,
        }
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn bar_focus(&self) -> BarFocus {
        self.focus
    }

    /// Routes one input event through the current mode.
    pub async fn handle_key(&mut self, key: OverlayKey) -> Result<()> {
        // Media keys work in every mode.
        match key {
            OverlayKey::PlayPause => {
                self.player.toggle_pause().await?;
                if self.mode == OverlayMode::Bar {
                    self.render_main().await?;
                }
                return Ok(());
            }
            OverlayKey::VolumeUp => return self.adjust_volume(self.volume_step).await,
            OverlayKey::VolumeDown => return self.adjust_volume(-self.volume_step).await,
            OverlayKey::Mute => return self.toggle_mute().await,
            _ => {}
        }

        match self.mode {
            OverlayMode::Hidden => match key {
                OverlayKey::Back => self.host.stop_requested(),
                // Any directional or activation input reveals the bar.
                _ => self.enter_bar().await?,
            },
            OverlayMode::Bar => self.handle_bar_key(key).await?,
            OverlayMode::TrackSelect => self.handle_panel_key(key).await?,
            OverlayMode::NextUp => match key {
                OverlayKey::Select => {
                    if let Lookahead::Found(info) = self.next_up.snapshot() {
                        debug!("Next-up banner activated for {}", info.item_id);
                        self.host.start_next_up(&info);
                    }
                }
                OverlayKey::Info => self.enter_bar().await?,
                OverlayKey::Back => self.host.stop_requested(),
                _ => {}
            },
        }
        Ok(())
    }

    /// Periodic work, driven by a once-per-frame call from the host.
    pub async fn tick(&mut self) -> Result<()> {
        let session = self.player.session();
        let now = Instant::now();

        match self.mode {
            OverlayMode::Bar => {
                if now.duration_since(self.last_activity) >= self.auto_hide {
                    if self.countdown_active(&session) {
                        self.enter_next_up().await?;
                    } else {
                        self.enter_hidden().await?;
                    }
                } else if self.second_changed(session.position_secs) {
                    self.render_main().await?;
                }
            }
            OverlayMode::Hidden => {
                if !self.banner_triggered
                    && self.episodic
                    && session.duration_secs > 0.0
                    && session.remaining_secs() <= NEXT_UP_THRESHOLD_SECS
                    && matches!(self.next_up.snapshot(), Lookahead::Found(_))
                {
                    self.banner_triggered = true;
                    self.enter_next_up().await?;
                    return Ok(());
                }
                self.refresh_paused_overlays(&session, now).await?;
            }
            OverlayMode::NextUp => {
                if self.second_changed(session.remaining_secs()) {
                    self.render_main().await?;
                }
            }
            OverlayMode::TrackSelect => {}
        }
        Ok(())
    }

    /// Session teardown: cancels the lookahead and removes every overlay
    /// slot this instance ever writes.
    pub async fn close(&mut self) {
        self.prefetch_cancel.cancel();
        for slot in [OSD_SLOT_MAIN, OSD_SLOT_CLOCK, OSD_SLOT_PAUSED_STATUS] {
            if let Err(e) = self.player.remove_persistent_overlay(slot).await {
                debug!("Overlay slot {} removal failed on close: {:#}", slot, e);
            }
        }
        if let Err(e) = self.player.remove_image_overlay(IMAGE_SLOT_NEXT_UP).await {
            debug!("Image overlay removal failed on close: {:#}", e);
        }
        self.mode = OverlayMode::Hidden;
        self.panel = None;
        self.minis_visible = false;
        self.banner_image_visible = false;
    }

    async fn handle_bar_key(&mut self, key: OverlayKey) -> Result<()> {
        self.last_activity = Instant::now();

        if key == OverlayKey::Info {
            return self.enter_hidden().await;
        }

        match self.focus {
            BarFocus::Buttons => match key {
                OverlayKey::Left => {
                    let len = self.bar_buttons().len();
                    self.button_index = (self.button_index + len - 1) % len;
                    self.render_main().await?;
                }
                OverlayKey::Right => {
                    let len = self.bar_buttons().len();
                    self.button_index = (self.button_index + 1) % len;
                    self.render_main().await?;
                }
                OverlayKey::Up => {
                    self.focus = BarFocus::Progress;
                    self.seek.reset();
                    self.render_main().await?;
                }
                OverlayKey::Select => self.activate_button().await?,
                OverlayKey::Back => self.host.stop_requested(),
                _ => {}
            },
            BarFocus::Progress => match key {
                OverlayKey::Left => self.accel_seek(SeekDirection::Back).await?,
                OverlayKey::Right => self.accel_seek(SeekDirection::Forward).await?,
                OverlayKey::Down | OverlayKey::Back => {
                    self.focus = BarFocus::Buttons;
                    self.render_main().await?;
                }
                _ => {}
            },
        }
        Ok(())
    }

    async fn accel_seek(&mut self, direction: SeekDirection) -> Result<()> {
        let delta = self.seek.press(direction, Instant::now());
        if let Err(e) = self.player.seek(delta).await {
            warn!("Seek by {}s failed: {:#}", delta, e);
        }
        self.render_main().await
    }

    async fn activate_button(&mut self) -> Result<()> {
        let buttons = self.bar_buttons();
        let button = buttons[self.button_index.min(buttons.len() - 1)];
        match button {
            BarButton::PlayPause => {
                self.player.toggle_pause().await?;
                self.render_main().await?;
            }
            BarButton::Subtitles => self.open_track_panel(TrackKind::Subtitle).await?,
            BarButton::Audio => self.open_track_panel(TrackKind::Audio).await?,
            BarButton::NextEpisode => {
                // Disabled until the lookahead resolves to a successor.
                if let Lookahead::Found(info) = self.next_up.snapshot() {
                    self.host.next_episode_requested(&info);
                }
            }
            BarButton::Stop => self.host.stop_requested(),
        }
        Ok(())
    }

    async fn open_track_panel(&mut self, kind: TrackKind) -> Result<()> {
        let tracks = match self.player.tracks(kind).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Track query failed, keeping the bar: {:#}", e);
                return Ok(());
            }
        };

        let mut entries = Vec::new();
        if kind == TrackKind::Subtitle {
            entries.push(PanelEntry {
                id: None,
                label: "None".to_string(),
                active: !tracks.iter().any(|t| t.selected),
            });
        }
        entries.extend(tracks.iter().map(|t| PanelEntry {
            id: Some(t.id),
            label: t.display_label(),
            active: t.selected,
        }));

        let cursor = entries.iter().position(|e| e.active).unwrap_or(0);
        self.panel = Some(TrackPanel {
            kind,
            entries,
            cursor,
        });
        self.mode = OverlayMode::TrackSelect;
        self.render_main().await
    }

    async fn handle_panel_key(&mut self, key: OverlayKey) -> Result<()> {
        match key {
            OverlayKey::Up => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.cursor = panel.cursor.saturating_sub(1);
                }
                self.render_main().await?;
            }
            OverlayKey::Down => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.cursor = (panel.cursor + 1).min(panel.entries.len().saturating_sub(1));
                }
                self.render_main().await?;
            }
            OverlayKey::Select => {
                let choice = self
                    .panel
                    .as_ref()
                    .and_then(|p| p.entries.get(p.cursor).map(|e| (p.kind, e.id)));
                if let Some((kind, id)) = choice {
                    let result = match (kind, id) {
                        (TrackKind::Subtitle, id) => self.player.set_subtitle_track(id).await,
                        (TrackKind::Audio, Some(id)) => self.player.set_audio_track(id).await,
                        (TrackKind::Audio, None) => Ok(()),
                    };
                    if let Err(e) = result {
                        warn!("Track selection failed: {:#}", e);
                    }
                }
                self.enter_bar().await?;
            }
            // Cancel from the picker always lands back in the bar.
            OverlayKey::Back => self.enter_bar().await?,
            _ => {}
        }
        Ok(())
    }

    async fn adjust_volume(&mut self, delta: i64) -> Result<()> {
        match self.player.adjust_volume(delta).await {
            Ok(volume) => {
                let _ = self
                    .player
                    .show_text(&format!("Volume {}%", volume.round() as i64), 1500)
                    .await;
            }
            Err(e) => warn!("Volume adjust failed: {:#}", e),
        }
        Ok(())
    }

    async fn toggle_mute(&mut self) -> Result<()> {
        match self.player.toggle_mute().await {
            Ok(muted) => {
                let text = if muted { "Muted" } else { "Unmuted" };
                let _ = self.player.show_text(text, 1500).await;
            }
            Err(e) => warn!("Mute toggle failed: {:#}", e),
        }
        Ok(())
    }

    fn countdown_active(&self, session: &PlaybackSession) -> bool {
        self.banner_triggered
            && self.episodic
            && session.duration_secs > 0.0
            && session.remaining_secs() <= NEXT_UP_THRESHOLD_SECS
            && matches!(self.next_up.snapshot(), Lookahead::Found(_))
    }

    fn second_changed(&mut self, value: f64) -> bool {
        let second = value as i64;
        if self.last_rendered_second != Some(second) {
            self.last_rendered_second = Some(second);
            true
        } else {
            false
        }
    }

    async fn enter_bar(&mut self) -> Result<()> {
        self.mode = OverlayMode::Bar;
        self.focus = BarFocus::Buttons;
        self.panel = None;
        self.last_activity = Instant::now();
        self.remove_minis().await?;
        self.remove_banner_image().await?;
        self.render_main().await
    }

    async fn enter_hidden(&mut self) -> Result<()> {
        self.mode = OverlayMode::Hidden;
        self.panel = None;
        self.remove_banner_image().await?;
        if let Err(e) = self.player.remove_persistent_overlay(OSD_SLOT_MAIN).await {
            debug!("Main overlay removal failed: {:#}", e);
        }
        Ok(())
    }

    async fn enter_next_up(&mut self) -> Result<()> {
        self.mode = OverlayMode::NextUp;
        self.panel = None;
        self.remove_minis().await?;
        self.render_main().await
    }

    async fn refresh_paused_overlays(
        &mut self,
        session: &PlaybackSession,
        now: Instant,
    ) -> Result<()> {
        if session.paused && session.playing {
            let due = match self.last_paused_refresh {
                None => true,
                Some(at) => now.duration_since(at) >= self.paused_refresh,
            };
            if due {
                self.last_paused_refresh = Some(now);
                self.render_clock().await?;
                self.render_paused_status(session).await?;
                self.minis_visible = true;
            }
        } else if self.minis_visible {
            self.remove_minis().await?;
        }
        Ok(())
    }

    async fn remove_minis(&mut self) -> Result<()> {
        if self.minis_visible {
            for slot in [OSD_SLOT_CLOCK, OSD_SLOT_PAUSED_STATUS] {
                if let Err(e) = self.player.remove_persistent_overlay(slot).await {
                    debug!("Overlay slot {} removal failed: {:#}", slot, e);
                }
            }
            self.minis_visible = false;
        }
        self.last_paused_refresh = None;
        Ok(())
    }

    async fn remove_banner_image(&mut self) -> Result<()> {
        if self.banner_image_visible {
            if let Err(e) = self.player.remove_image_overlay(IMAGE_SLOT_NEXT_UP).await {
                debug!("Next-up image removal failed: {:#}", e);
            }
            self.banner_image_visible = false;
        }
        Ok(())
    }

    // === Rendering ===

    async fn render_main(&mut self) -> Result<()> {
        let session = self.player.session();
        let markup = match self.mode {
            OverlayMode::Bar => self.bar_markup(&session),
            OverlayMode::TrackSelect => self.panel_markup(),
            OverlayMode::NextUp => match self.next_up.snapshot() {
                Lookahead::Found(info) => {
                    self.ensure_banner_image(&info).await?;
                    self.banner_markup(&info, &session)
                }
                _ => return self.enter_hidden().await,
            },
            OverlayMode::Hidden => return Ok(()),
        };
        // A failed render must not bubble out of input handling; the next
        // state change redraws anyway.
        if let Err(e) = self
            .player
            .set_persistent_overlay(OSD_SLOT_MAIN, markup, self.canvas_w, self.canvas_h)
            .await
        {
            warn!("Overlay render failed: {:#}", e);
        }
        Ok(())
    }

    fn bar_buttons(&self) -> Vec<BarButton> {
        let mut buttons = vec![BarButton::PlayPause, BarButton::Subtitles, BarButton::Audio];
        if self.episodic {
            buttons.push(BarButton::NextEpisode);
        }
        buttons.push(BarButton::Stop);
        buttons
    }

    fn button_label(&self, button: BarButton, session: &PlaybackSession) -> &'static str {
        match button {
            BarButton::PlayPause => {
                if session.paused {
                    "Play"
                } else {
                    "Pause"
                }
            }
            BarButton::Subtitles => "Subtitles",
            BarButton::Audio => "Audio",
            BarButton::NextEpisode => "Next Episode",
            BarButton::Stop => "Stop",
        }
    }

    fn bar_markup(&self, session: &PlaybackSession) -> String {
        let font = scaled_font_size(FONT_BASE_BAR, self.canvas_h);
        let buttons = self.bar_buttons();
        let lookahead = self.next_up.snapshot();
        let next_up_ready = matches!(lookahead, Lookahead::Found(_));

        let mut row = String::new();
        for (i, button) in buttons.iter().enumerate() {
            let focused = self.focus == BarFocus::Buttons && i == self.button_index;
            let enabled = *button != BarButton::NextEpisode || next_up_ready;
            let color = if !enabled {
                COLOR_DIM
            } else if focused {
                COLOR_ACCENT
            } else {
                COLOR_TEXT
            };
            row.push_str(&ass_bold(focused));
            row.push_str(&ass_color(color));
            row.push_str(self.button_label(*button, session));
            row.push_str("    ");
        }

        let columns = progress_columns(self.canvas_w);
        let bar = progress_bar(session.position_secs, session.duration_secs, columns);
        let bar_color = if self.focus == BarFocus::Progress {
            COLOR_ACCENT
        } else {
            COLOR_TEXT
        };

        let mut markup = format!(
            "{}{}{}\\N{}{}{}{} {} / {}",
            ass_align(2),
            ass_font_size(font),
            row,
            ass_bold(false),
            ass_color(bar_color),
            ass_font_size(font),
            bar,
            format_timestamp(session.position_secs),
            format_timestamp(session.duration_secs),
        );

        // Tooltip for the focused next-episode button.
        if self.focus == BarFocus::Buttons
            && buttons.get(self.button_index) == Some(&BarButton::NextEpisode)
            && let Lookahead::Found(info) = lookahead
        {
            markup.push_str(&format!(
                "\\N{}{}Next: S{:02}E{:02} · {}",
                ass_color(COLOR_DIM),
                ass_font_size(scaled_font_size(FONT_BASE_STATUS, self.canvas_h)),
                info.season_number,
                info.episode_number,
                ass_escape(&info.title),
            ));
        }
        markup
    }

    fn panel_markup(&self) -> String {
        let font = scaled_font_size(FONT_BASE_PANEL, self.canvas_h);
        let Some(panel) = self.panel.as_ref() else {
            return String::new();
        };

        let mut body = format!(
            "{}{}{}{}{}",
            ass_align(5),
            ass_font_size(font),
            ass_bold(true),
            ass_color(COLOR_TEXT),
            panel.kind.label(),
        );
        for (i, entry) in panel.entries.iter().enumerate() {
            let focused = i == panel.cursor;
            let marker = if entry.active { "● " } else { "   " };
            let cursor = if focused { "▶ " } else { "  " };
            body.push_str("\\N");
            body.push_str(&ass_bold(focused));
            body.push_str(&ass_color(if focused { COLOR_ACCENT } else { COLOR_TEXT }));
            body.push_str(cursor);
            body.push_str(marker);
            body.push_str(&ass_escape(&entry.label));
        }
        body
    }

    fn banner_markup(&self, info: &NextEpisodeInfo, session: &PlaybackSession) -> String {
        let font = scaled_font_size(FONT_BASE_BANNER, self.canvas_h);
        let countdown = session.remaining_secs().ceil() as i64;
        format!(
            "{}{}{}{}Up Next · Episode {}\\N{}{}{}\\N{}Starting in {}s",
            ass_align(3),
            ass_font_size(font),
            ass_bold(true),
            ass_color(COLOR_ACCENT),
            info.episode_number,
            ass_bold(false),
            ass_color(COLOR_TEXT),
            ass_escape(&info.title),
            ass_color(COLOR_DIM),
            countdown.max(0),
        )
    }

    async fn ensure_banner_image(&mut self, info: &NextEpisodeInfo) -> Result<()> {
        if self.banner_image_visible {
            return Ok(());
        }
        let Some(thumb) = info.thumb.as_ref() else {
            return Ok(());
        };
        let margin = self.canvas_w / 48;
        let x = self.canvas_w.saturating_sub(thumb.width + margin);
        let y = self
            .canvas_h
            .saturating_sub(thumb.height + self.canvas_h / 5);
        match self
            .player
            .add_image_overlay(
                IMAGE_SLOT_NEXT_UP,
                x,
                y,
                thumb.path(),
                thumb.width,
                thumb.height,
            )
            .await
        {
            Ok(()) => self.banner_image_visible = true,
            // Text-only banner when the image overlay fails.
            Err(e) => debug!("Next-up image overlay failed: {:#}", e),
        }
        Ok(())
    }

    async fn render_clock(&mut self) -> Result<()> {
        let font = scaled_font_size(FONT_BASE_CLOCK, self.canvas_h);
        let markup = format!(
            "{}{}{}{}",
            ass_align(9),
            ass_font_size(font),
            ass_color(COLOR_TEXT),
            chrono::Local::now().format("%H:%M"),
        );
        if let Err(e) = self
            .player
            .set_persistent_overlay(OSD_SLOT_CLOCK, markup, self.canvas_w, self.canvas_h)
            .await
        {
            warn!("Clock overlay render failed: {:#}", e);
        }
        Ok(())
    }

    async fn render_paused_status(&mut self, session: &PlaybackSession) -> Result<()> {
        let font = scaled_font_size(FONT_BASE_STATUS, self.canvas_h);
        let columns = progress_columns(self.canvas_w);
        let markup = format!(
            "{}{}{}⏸ {} {} / {}",
            ass_align(1),
            ass_font_size(font),
            ass_color(COLOR_TEXT),
            progress_bar(session.position_secs, session.duration_secs, columns),
            format_timestamp(session.position_secs),
            format_timestamp(session.duration_secs),
        );
        if let Err(e) = self
            .player
            .set_persistent_overlay(OSD_SLOT_PAUSED_STATUS, markup, self.canvas_w, self.canvas_h)
            .await
        {
            warn!("Paused status overlay render failed: {:#}", e);
        }
        Ok(())
    }
}
