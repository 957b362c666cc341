use anyhow::{Context, Result};
use async_trait::async_trait;
use image::DynamicImage;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::NetworkConfig;

/// Poster/thumbnail source used by the lookahead pipeline.
#[async_trait]
pub trait ImageCache: Send + Sync {
    /// Returns a decoded image if it is already cached, without I/O.
    fn get_cached(&self, url: &str) -> Option<DynamicImage>;

    /// Fetches and decodes the image, populating the cache.
    async fn load(&self, url: &str) -> Result<DynamicImage>;
}

/// Default collaborator: HTTP fetch with a bounded per-request timeout plus
/// an LRU of decoded images.
pub struct HttpImageCache {
    client: reqwest::Client,
    cache: Mutex<LruCache<String, DynamicImage>>,
}

impl HttpImageCache {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build image cache HTTP client")?;
        let capacity =
            NonZeroUsize::new(config.image_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            client,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }
}

#[async_trait]
impl ImageCache for HttpImageCache {
    fn get_cached(&self, url: &str) -> Option<DynamicImage> {
        self.cache.lock().unwrap().get(url).cloned()
    }

    async fn load(&self, url: &str) -> Result<DynamicImage> {
        if let Some(image) = self.get_cached(url) {
            trace!("Image cache hit: {}", url);
            return Ok(image);
        }

        debug!("Fetching image: {}", url);
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .context("Image request failed")?
            .error_for_status()
            .context("Image request returned an error status")?
            .bytes()
            .await
            .context("Failed to read image body")?;

        let image = image::load_from_memory(&bytes).context("Failed to decode image")?;
        self.cache
            .lock()
            .unwrap()
            .put(url.to_string(), image.clone());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 20, 30, 255]),
        ));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn load_decodes_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/thumb.png")
            .with_body(png_bytes(16, 9))
            .expect(1)
            .create_async()
            .await;

        let cache = HttpImageCache::new(&NetworkConfig::default()).unwrap();
        let url = format!("{}/thumb.png", server.url());

        assert!(cache.get_cached(&url).is_none());
        let first = cache.load(&url).await.unwrap();
        assert_eq!((first.width(), first.height()), (16, 9));

        // Second load is served from the LRU, not the server.
        let second = cache.load(&url).await.unwrap();
        assert_eq!(second.width(), 16);
        assert!(cache.get_cached(&url).is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let cache = HttpImageCache::new(&NetworkConfig::default()).unwrap();
        let url = format!("{}/missing.png", server.url());
        assert!(cache.load(&url).await.is_err());
        assert!(cache.get_cached(&url).is_none());
    }
}
