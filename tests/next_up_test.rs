mod common;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use clicker::catalog::ImageKind;
use clicker::models::MediaItemId;
use clicker::player::{Lookahead, NextEpisodePrefetcher, NextUpSlot};

use common::{CannedImageCache, InMemoryCatalog, episode_item, episode_ref, season_ref};

/// A three-episode season in the middle of a four-season series.
fn series_catalog() -> InMemoryCatalog {
    common::init_tracing();
    let catalog = InMemoryCatalog::default();
    catalog.insert_seasons(
        "show",
        vec![
            season_ref("s1", 1),
            season_ref("s2", 2),
            season_ref("s3", 3),
            season_ref("s4", 4),
        ],
    );
    catalog.insert_episodes(
        "s2",
        vec![
            episode_ref("ep1", "Opening", 2, 1),
            episode_ref("ep2", "Middle", 2, 2),
            episode_ref("ep3", "Finale", 2, 3),
        ],
    );
    for id in ["ep1", "ep2", "ep3"] {
        let number = id.trim_start_matches("ep").parse().unwrap();
        catalog.insert_item(episode_item(id, "show", "s2", 2, number, "Episode"));
    }
    catalog
}

async fn resolve(catalog: &InMemoryCatalog, images: CannedImageCache, current: &str) -> Lookahead {
    let prefetcher =
        NextEpisodePrefetcher::new(Arc::new(catalog.clone()), Arc::new(images));
    let slot = Arc::new(NextUpSlot::new());
    prefetcher
        .spawn(
            MediaItemId::new(current),
            slot.clone(),
            CancellationToken::new(),
            1920,
        )
        .await
        .unwrap();
    slot.snapshot()
}

#[tokio::test]
async fn successor_within_the_same_season() {
    let catalog = series_catalog();
    let result = resolve(&catalog, CannedImageCache::failing(), "ep2").await;

    let Lookahead::Found(info) = result else {
        panic!("expected Found, got {result:?}");
    };
    assert_eq!(info.item_id, MediaItemId::new("ep3"));
    assert_eq!(info.title, "Finale");
    assert_eq!(info.season_number, 2);
    assert_eq!(info.episode_number, 3);
}

#[tokio::test]
async fn season_boundary_skips_empty_seasons() {
    let catalog = series_catalog();
    // Season 3 has no episodes; season 4 opens with ep40.
    catalog.insert_episodes("s4", vec![episode_ref("ep40", "Return", 4, 1)]);

    let result = resolve(&catalog, CannedImageCache::failing(), "ep3").await;
    let Lookahead::Found(info) = result else {
        panic!("expected Found, got {result:?}");
    };
    assert_eq!(info.item_id, MediaItemId::new("ep40"));
    assert_eq!(info.season_number, 4);
    assert_eq!(info.episode_number, 1);
}

#[tokio::test]
async fn last_episode_of_the_series_is_absent() {
    let catalog = series_catalog();
    let result = resolve(&catalog, CannedImageCache::failing(), "ep3").await;
    assert!(matches!(result, Lookahead::Absent), "got {result:?}");
}

#[tokio::test]
async fn item_without_series_context_is_absent() {
    let catalog = InMemoryCatalog::default();
    let mut movie = episode_item("movie", "", "", 0, 0, "A Film");
    movie.series_id = None;
    movie.season_id = None;
    catalog.insert_item(movie);

    let result = resolve(&catalog, CannedImageCache::failing(), "movie").await;
    assert!(matches!(result, Lookahead::Absent), "got {result:?}");
}

#[tokio::test]
async fn catalog_failure_publishes_absent_not_pending() {
    let catalog = series_catalog();
    catalog.fail_lookups();

    let result = resolve(&catalog, CannedImageCache::failing(), "ep2").await;
    assert!(matches!(result, Lookahead::Absent), "got {result:?}");
}

#[tokio::test]
async fn thumbnail_failure_still_reports_the_successor() {
    let catalog = series_catalog();
    let mut next = episode_item("ep3", "show", "s2", 2, 3, "Episode");
    next.image_tags.push((ImageKind::Thumb, "tag-3".into()));
    catalog.insert_item(next);

    let result = resolve(&catalog, CannedImageCache::failing(), "ep2").await;
    let Lookahead::Found(info) = result else {
        panic!("expected Found, got {result:?}");
    };
    assert!(info.thumb.is_none());
}

#[tokio::test]
async fn successful_thumbnail_is_scaled_and_packed_as_bgra() {
    let catalog = series_catalog();
    let mut next = episode_item("ep3", "show", "s2", 2, 3, "Episode");
    next.image_tags.push((ImageKind::Thumb, "tag-3".into()));
    catalog.insert_item(next);

    // 16:9 source at a 1920-wide canvas scales to the 320-pixel base width.
    let result = resolve(&catalog, CannedImageCache::with_image(640, 360), "ep2").await;
    let Lookahead::Found(info) = result else {
        panic!("expected Found, got {result:?}");
    };
    let thumb = info.thumb.expect("thumbnail should be prepared");
    assert_eq!((thumb.width, thumb.height), (320, 180));

    let bytes = std::fs::read(thumb.path()).unwrap();
    assert_eq!(bytes.len(), 320 * 180 * 4);
    // Canned pixel is RGBA (40, 80, 120, 255); the file stores BGRA.
    assert_eq!(&bytes[..4], &[120, 80, 40, 255]);
}

#[tokio::test]
async fn smaller_canvas_shrinks_the_thumbnail() {
    let catalog = series_catalog();
    let mut next = episode_item("ep3", "show", "s2", 2, 3, "Episode");
    next.image_tags.push((ImageKind::Primary, "tag-3".into()));
    catalog.insert_item(next);

    let prefetcher = NextEpisodePrefetcher::new(
        Arc::new(catalog.clone()),
        Arc::new(CannedImageCache::with_image(640, 360)),
    );
    let slot = Arc::new(NextUpSlot::new());
    prefetcher
        .spawn(
            MediaItemId::new("ep2"),
            slot.clone(),
            CancellationToken::new(),
            960,
        )
        .await
        .unwrap();

    let Lookahead::Found(info) = slot.snapshot() else {
        panic!("expected Found");
    };
    let thumb = info.thumb.expect("thumbnail should be prepared");
    assert_eq!((thumb.width, thumb.height), (160, 90));
}

#[tokio::test]
async fn cancelled_prefetch_never_publishes() {
    let catalog = series_catalog();
    let prefetcher = NextEpisodePrefetcher::new(
        Arc::new(catalog),
        Arc::new(CannedImageCache::failing()),
    );
    let slot = Arc::new(NextUpSlot::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    prefetcher
        .spawn(MediaItemId::new("ep2"), slot.clone(), cancel, 1920)
        .await
        .unwrap();
    assert!(matches!(slot.snapshot(), Lookahead::Pending));
}

#[tokio::test]
async fn cancelling_one_session_leaves_the_next_untouched() {
    let catalog = series_catalog();
    let prefetcher = NextEpisodePrefetcher::new(
        Arc::new(catalog),
        Arc::new(CannedImageCache::failing()),
    );

    let first_slot = Arc::new(NextUpSlot::new());
    let first_cancel = CancellationToken::new();
    first_cancel.cancel();
    prefetcher
        .spawn(MediaItemId::new("ep1"), first_slot.clone(), first_cancel, 1920)
        .await
        .unwrap();

    let second_slot = Arc::new(NextUpSlot::new());
    prefetcher
        .spawn(
            MediaItemId::new("ep2"),
            second_slot.clone(),
            CancellationToken::new(),
            1920,
        )
        .await
        .unwrap();

    assert!(matches!(first_slot.snapshot(), Lookahead::Pending));
    assert!(matches!(second_slot.snapshot(), Lookahead::Found(_)));
}
