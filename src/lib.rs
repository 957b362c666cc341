#![allow(clippy::result_large_err)]

pub mod cache;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod engine;
pub mod models;
pub mod osd;
pub mod player;

pub use config::Config;
pub use engine::{EngineError, EngineEvent, MediaEngine, PropertyValue};
pub use osd::{OverlayKey, OverlayMode, PlaybackOverlay};
pub use player::{
    Lookahead, NextEpisodePrefetcher, NextUpSlot, PlaybackHost, PlaybackSession, PlayerController,
    PlayerHandle, WindowTarget,
};
