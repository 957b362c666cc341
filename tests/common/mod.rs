#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use clicker::catalog::{CatalogItem, CatalogProvider, EpisodeRef, ImageKind, SeasonRef};
use clicker::cache::ImageCache;
use clicker::engine::{EngineError, EngineEvent, MediaEngine, PropertyValue};
use clicker::models::{MediaItemId, NextEpisodeInfo, SeasonId, SeriesId};
use clicker::player::{PlaybackHost, WindowTarget};

static TRACING: Once = Once::new();

/// Capture logs per test, filterable with RUST_LOG.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Give the 30ms controller loop time to service commands and drain events.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

// === Engine ===

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AttachWindow(i64),
    Command(String, Vec<String>),
    SetProperty(String, String),
    Observe(String),
}

/// Shared scripting surface for `FakeEngine`: tests keep a clone to push
/// events, stage property values and inspect the recorded call log.
#[derive(Clone, Default)]
pub struct EngineScript {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    events: Arc<Mutex<VecDeque<EngineEvent>>>,
    properties: Arc<Mutex<HashMap<String, PropertyValue>>>,
    failing_commands: Arc<Mutex<Vec<String>>>,
}

impl EngineScript {
    pub fn push_event(&self, event: EngineEvent) {
        self.events.lock().unwrap().push_back(event);
    }

    pub fn stage_property(&self, name: &str, value: PropertyValue) {
        self.properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }

    pub fn fail_command(&self, name: &str) {
        self.failing_commands.lock().unwrap().push(name.to_string());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands_named(&self, name: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Command(n, args) if n == name => Some(args),
                _ => None,
            })
            .collect()
    }

    /// Stages a subtitle/audio track table the way the engine exposes it.
    pub fn stage_tracks(&self, tracks: &[(i64, &str, &str, bool)]) {
        self.stage_property("track-list/count", PropertyValue::Int(tracks.len() as i64));
        for (i, (id, kind, title, selected)) in tracks.iter().enumerate() {
            self.stage_property(&format!("track-list/{i}/type"), PropertyValue::Text(kind.to_string()));
            self.stage_property(&format!("track-list/{i}/id"), PropertyValue::Int(*id));
            self.stage_property(
                &format!("track-list/{i}/title"),
                PropertyValue::Text(title.to_string()),
            );
            self.stage_property(
                &format!("track-list/{i}/selected"),
                PropertyValue::Flag(*selected),
            );
        }
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Scripted engine: records every call, replays staged events and serves
/// staged property values.
pub struct FakeEngine {
    pub script: EngineScript,
}

impl FakeEngine {
    pub fn new() -> (Box<Self>, EngineScript) {
        let script = EngineScript::default();
        (
            Box::new(Self {
                script: script.clone(),
            }),
            script,
        )
    }

    fn property(&self, name: &str) -> Result<PropertyValue, EngineError> {
        self.script
            .properties
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::property(name, "not staged"))
    }
}

impl MediaEngine for FakeEngine {
    fn attach_window(&mut self, handle: i64) -> Result<(), EngineError> {
        self.script.record(EngineCall::AttachWindow(handle));
        Ok(())
    }

    fn command(&mut self, name: &str, args: &[&str]) -> Result<(), EngineError> {
        self.script.record(EngineCall::Command(
            name.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        if self
            .script
            .failing_commands
            .lock()
            .unwrap()
            .iter()
            .any(|f| f == name)
        {
            return Err(EngineError::command(name, "scripted failure"));
        }
        Ok(())
    }

    fn set_property_f64(&mut self, name: &str, value: f64) -> Result<(), EngineError> {
        self.script
            .record(EngineCall::SetProperty(name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_property_i64(&mut self, name: &str, value: i64) -> Result<(), EngineError> {
        self.script
            .record(EngineCall::SetProperty(name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_property_bool(&mut self, name: &str, value: bool) -> Result<(), EngineError> {
        self.script
            .record(EngineCall::SetProperty(name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_property_str(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.script
            .record(EngineCall::SetProperty(name.to_string(), value.to_string()));
        Ok(())
    }

    fn get_property_f64(&mut self, name: &str) -> Result<f64, EngineError> {
        match self.property(name)? {
            PropertyValue::Double(v) => Ok(v),
            other => Err(EngineError::property(name, format!("staged as {other:?}"))),
        }
    }

    fn get_property_i64(&mut self, name: &str) -> Result<i64, EngineError> {
        match self.property(name)? {
            PropertyValue::Int(v) => Ok(v),
            other => Err(EngineError::property(name, format!("staged as {other:?}"))),
        }
    }

    fn get_property_bool(&mut self, name: &str) -> Result<bool, EngineError> {
        match self.property(name)? {
            PropertyValue::Flag(v) => Ok(v),
            other => Err(EngineError::property(name, format!("staged as {other:?}"))),
        }
    }

    fn get_property_str(&mut self, name: &str) -> Result<String, EngineError> {
        match self.property(name)? {
            PropertyValue::Text(v) => Ok(v),
            other => Err(EngineError::property(name, format!("staged as {other:?}"))),
        }
    }

    fn observe_property(&mut self, name: &str) -> Result<(), EngineError> {
        self.script.record(EngineCall::Observe(name.to_string()));
        Ok(())
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.script.events.lock().unwrap().pop_front()
    }
}

// === Host ===

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Ended(Option<String>),
    StopRequested,
    NextEpisodeRequested(String),
    StartNextUp(String),
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PlaybackHost for RecordingHost {
    fn playback_ended(&self, item_id: Option<&MediaItemId>) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::Ended(item_id.map(|id| id.to_string())));
    }

    fn stop_requested(&self) {
        self.events.lock().unwrap().push(HostEvent::StopRequested);
    }

    fn next_episode_requested(&self, info: &NextEpisodeInfo) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::NextEpisodeRequested(info.item_id.to_string()));
    }

    fn start_next_up(&self, info: &NextEpisodeInfo) {
        self.events
            .lock()
            .unwrap()
            .push(HostEvent::StartNextUp(info.item_id.to_string()));
    }
}

// === Window ===

pub struct FixedWindow {
    pub handle: i64,
    pub size: (u32, u32),
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self {
            handle: 0x42,
            size: (1920, 1080),
        }
    }
}

impl WindowTarget for FixedWindow {
    fn window_handle(&self) -> Result<i64> {
        Ok(self.handle)
    }

    fn display_size(&self) -> (u32, u32) {
        self.size
    }
}

pub struct BrokenWindow;

impl WindowTarget for BrokenWindow {
    fn window_handle(&self) -> Result<i64> {
        Err(anyhow!("no window available"))
    }

    fn display_size(&self) -> (u32, u32) {
        (1920, 1080)
    }
}

// === Catalog ===

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<Mutex<HashMap<MediaItemId, CatalogItem>>>,
    seasons: Arc<Mutex<HashMap<SeriesId, Vec<SeasonRef>>>>,
    episodes: Arc<Mutex<HashMap<SeasonId, Vec<EpisodeRef>>>>,
    failing: Arc<Mutex<bool>>,
}

impl InMemoryCatalog {
    pub fn insert_item(&self, item: CatalogItem) {
        self.items.lock().unwrap().insert(item.id.clone(), item);
    }

    pub fn insert_seasons(&self, series: &str, seasons: Vec<SeasonRef>) {
        self.seasons
            .lock()
            .unwrap()
            .insert(SeriesId::new(series), seasons);
    }

    pub fn insert_episodes(&self, season: &str, episodes: Vec<EpisodeRef>) {
        self.episodes
            .lock()
            .unwrap()
            .insert(SeasonId::new(season), episodes);
    }

    pub fn fail_lookups(&self) {
        *self.failing.lock().unwrap() = true;
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn item(&self, id: &MediaItemId) -> Result<CatalogItem> {
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("catalog unreachable"));
        }
        self.items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown item {id}"))
    }

    async fn seasons(&self, series: &SeriesId) -> Result<Vec<SeasonRef>> {
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("catalog unreachable"));
        }
        Ok(self
            .seasons
            .lock()
            .unwrap()
            .get(series)
            .cloned()
            .unwrap_or_default())
    }

    async fn season_episodes(&self, season: &SeasonId) -> Result<Vec<EpisodeRef>> {
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("catalog unreachable"));
        }
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(season)
            .cloned()
            .unwrap_or_default())
    }

    fn image_url(&self, item: &MediaItemId, kind: ImageKind, tag: &str) -> String {
        format!("http://catalog.test/items/{item}/images/{kind:?}/{tag}")
    }
}

pub fn episode_item(
    id: &str,
    series: &str,
    season: &str,
    season_number: u32,
    episode_number: u32,
    title: &str,
) -> CatalogItem {
    CatalogItem {
        id: MediaItemId::new(id),
        title: title.to_string(),
        series_id: Some(SeriesId::new(series)),
        season_id: Some(SeasonId::new(season)),
        season_number: Some(season_number),
        episode_number: Some(episode_number),
        image_tags: Vec::new(),
    }
}

pub fn episode_ref(id: &str, title: &str, season_number: u32, episode_number: u32) -> EpisodeRef {
    EpisodeRef {
        id: MediaItemId::new(id),
        title: title.to_string(),
        season_number,
        episode_number,
    }
}

pub fn season_ref(id: &str, number: u32) -> SeasonRef {
    SeasonRef {
        id: SeasonId::new(id),
        number,
    }
}

// === Image cache ===

/// Serves one canned bitmap for every URL, or fails every load.
pub struct CannedImageCache {
    image: Option<DynamicImage>,
}

impl CannedImageCache {
    pub fn with_image(width: u32, height: u32) -> Self {
        Self {
            image: Some(DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([40, 80, 120, 255]),
            ))),
        }
    }

    pub fn failing() -> Self {
        Self { image: None }
    }
}

#[async_trait]
impl ImageCache for CannedImageCache {
    fn get_cached(&self, _url: &str) -> Option<DynamicImage> {
        None
    }

    async fn load(&self, _url: &str) -> Result<DynamicImage> {
        self.image
            .clone()
            .ok_or_else(|| anyhow!("image fetch failed"))
    }
}
