//! Next-episode lookahead: resolve the successor of the playing episode,
//! prefetch its thumbnail and publish the result for the overlay.

use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::ImageCache;
use crate::catalog::{CatalogProvider, EpisodeRef, ImageKind};
use crate::constants::{BASELINE_CANVAS_W, NEXT_UP_THUMB_BASE_WIDTH};
use crate::models::{MediaItemId, NextEpisodeInfo, PreparedThumb};
use crate::osd::image::prepare_overlay_image;

/// Tri-state lookahead result. `Pending` must not be confused with
/// `Absent`: the overlay renders a disabled button only once absence is
/// explicit.
#[derive(Debug, Clone, Default)]
pub enum Lookahead {
    #[default]
    Pending,
    Found(NextEpisodeInfo),
    Absent,
}

/// Per-session slot the prefetch pipeline publishes into. A fresh slot is
/// created for every session, so a stale publish from a previous session
/// lands in an orphaned slot and is never observed.
#[derive(Debug, Default)]
pub struct NextUpSlot {
    state: Mutex<Lookahead>,
}

impl NextUpSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_found(&self, info: NextEpisodeInfo) {
        *self.state.lock().unwrap() = Lookahead::Found(info);
    }

    pub fn publish_absent(&self) {
        *self.state.lock().unwrap() = Lookahead::Absent;
    }

    pub fn snapshot(&self) -> Lookahead {
        self.state.lock().unwrap().clone()
    }
}

/// Resolves and pre-fetches the successor of the item currently playing,
/// detached from the playback-start path.
pub struct NextEpisodePrefetcher {
    catalog: Arc<dyn CatalogProvider>,
    images: Arc<dyn ImageCache>,
}

impl NextEpisodePrefetcher {
    pub fn new(catalog: Arc<dyn CatalogProvider>, images: Arc<dyn ImageCache>) -> Self {
        Self { catalog, images }
    }

    /// Spawns the pipeline for `current`. Cancelling the token (session
    /// stop) discards the in-flight result without publishing.
    pub fn spawn(
        &self,
        current: MediaItemId,
        slot: Arc<NextUpSlot>,
        cancel: CancellationToken,
        canvas_w: u32,
    ) -> JoinHandle<()> {
        let catalog = self.catalog.clone();
        let images = self.images.clone();
        tokio::spawn(async move {
            let for_item = current.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Next-episode prefetch cancelled for {}", for_item);
                }
                _ = run(catalog, images, current, slot, canvas_w) => {}
            }
        })
    }
}

async fn run(
    catalog: Arc<dyn CatalogProvider>,
    images: Arc<dyn ImageCache>,
    current_id: MediaItemId,
    slot: Arc<NextUpSlot>,
    canvas_w: u32,
) {
    let successor = match resolve_successor(catalog.as_ref(), &current_id).await {
        Ok(Some(episode)) => episode,
        Ok(None) => {
            debug!("No next episode after {}", current_id);
            slot.publish_absent();
            return;
        }
        Err(e) => {
            warn!("Next-episode lookup failed for {}: {:#}", current_id, e);
            slot.publish_absent();
            return;
        }
    };

    // The successor is identified; thumbnail trouble only omits the image.
    let thumb = fetch_thumb(catalog.as_ref(), images.as_ref(), &successor.id, canvas_w).await;

    debug!(
        "Next episode resolved: S{:02}E{:02} `{}`",
        successor.season_number, successor.episode_number, successor.title
    );
    slot.publish_found(NextEpisodeInfo {
        item_id: successor.id,
        title: successor.title,
        season_number: successor.season_number,
        episode_number: successor.episode_number,
        thumb,
    });
}

/// Next episode within the same season; at a season boundary, the first
/// episode of the next non-empty season.
async fn resolve_successor(
    catalog: &dyn CatalogProvider,
    current_id: &MediaItemId,
) -> anyhow::Result<Option<EpisodeRef>> {
    let current = catalog.item(current_id).await?;
    let (series_id, season_id) = match (&current.series_id, &current.season_id) {
        (Some(series), Some(season)) => (series.clone(), season.clone()),
        _ => return Ok(None),
    };

    let episodes = catalog.season_episodes(&season_id).await?;
    if let Some(index) = episodes.iter().position(|e| e.id == current.id)
        && index + 1 < episodes.len()
    {
        return Ok(Some(episodes[index + 1].clone()));
    }

    let seasons = catalog.seasons(&series_id).await?;
    let from = seasons
        .iter()
        .position(|s| s.id == season_id)
        .map(|i| i + 1)
        .unwrap_or(seasons.len());
    for season in &seasons[from..] {
        match catalog.season_episodes(&season.id).await {
            Ok(episodes) => {
                if let Some(first) = episodes.first() {
                    return Ok(Some(first.clone()));
                }
            }
            Err(e) => {
                warn!("Skipping season {} after lookup error: {:#}", season.id, e);
            }
        }
    }
    Ok(None)
}

async fn fetch_thumb(
    catalog: &dyn CatalogProvider,
    images: &dyn ImageCache,
    item_id: &MediaItemId,
    canvas_w: u32,
) -> Option<PreparedThumb> {
    let item = match catalog.item(item_id).await {
        Ok(item) => item,
        Err(e) => {
            debug!("Next-episode metadata fetch failed: {:#}", e);
            return None;
        }
    };

    let (kind, tag) = item
        .image_tag(ImageKind::Thumb)
        .map(|t| (ImageKind::Thumb, t))
        .or_else(|| item.image_tag(ImageKind::Primary).map(|t| (ImageKind::Primary, t)))?;
    let url = catalog.image_url(item_id, kind, tag);

    let bitmap = match images.get_cached(&url) {
        Some(bitmap) => bitmap,
        None => match images.load(&url).await {
            Ok(bitmap) => bitmap,
            Err(e) => {
                debug!("Next-episode thumbnail fetch failed: {:#}", e);
                return None;
            }
        },
    };

    let target_w =
        ((NEXT_UP_THUMB_BASE_WIDTH as u64 * canvas_w as u64) / BASELINE_CANVAS_W as u64).max(64)
            as u32;
    let scaled = bitmap.thumbnail(target_w, target_w);

    let mut file = match NamedTempFile::new() {
        Ok(file) => file,
        Err(e) => {
            debug!("Next-episode thumbnail temp file failed: {}", e);
            return None;
        }
    };
    match prepare_overlay_image(&scaled, &mut file) {
        Ok((width, height)) => Some(PreparedThumb {
            file: Arc::new(file),
            width,
            height,
        }),
        Err(e) => {
            debug!("Next-episode thumbnail conversion failed: {:#}", e);
            None
        }
    }
}
