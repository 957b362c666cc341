//! Collaborator interface to the media server's catalog. Only what the
//! next-episode lookahead needs; catalog browsing lives elsewhere.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{MediaItemId, SeasonId, SeriesId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Thumb,
    Primary,
}

/// Catalog metadata for a single item, reduced to the fields the lookahead
/// pipeline reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: MediaItemId,
    pub title: String,
    pub series_id: Option<SeriesId>,
    pub season_id: Option<SeasonId>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub image_tags: Vec<(ImageKind, String)>,
}

impl CatalogItem {
    pub fn image_tag(&self, kind: ImageKind) -> Option<&str> {
        self.image_tags
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, tag)| tag.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRef {
    pub id: SeasonId,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub id: MediaItemId,
    pub title: String,
    pub season_number: u32,
    pub episode_number: u32,
}

/// Season/episode/item lookups against the media server. Implementations
/// carry their own per-request timeout.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn item(&self, id: &MediaItemId) -> Result<CatalogItem>;

    /// Seasons of a series in ascending order.
    async fn seasons(&self, series: &SeriesId) -> Result<Vec<SeasonRef>>;

    /// Episodes of a season in ascending order.
    async fn season_episodes(&self, season: &SeasonId) -> Result<Vec<EpisodeRef>>;

    /// URL for an item image with the given kind and tag.
    fn image_url(&self, item: &MediaItemId, kind: ImageKind, tag: &str) -> String;
}
