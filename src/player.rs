// src/player.rs

use async_trait::async_trait;
use reqwest::Url;

use crate::error::{PlayerError, PlayerResult};

/// Where the current video identifier comes from.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// URL of the page the widget lives on, if one is loaded.
    async fn current_url(&self) -> Option<String>;

    async fn video_id(&self) -> Option<String> {
        self.current_url()
            .await
            .as_deref()
            .and_then(video_id_from_url)
    }
}

/// The page's video element.
#[async_trait]
pub trait VideoPlayer: Send + Sync {
    async fn seek(&self, seconds: f64) -> PlayerResult<()>;

    async fn play(&self) -> PlayerResult<()>;
}

/// Extracts the `v` query parameter of a watch URL.
pub fn video_id_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// A page pinned to one URL, for asking without a browser.
#[derive(Clone, Debug)]
pub struct FixedUrl(pub String);

#[async_trait]
impl VideoSource for FixedUrl {
    async fn current_url(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Stands in for a page that has no video element.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPlayer;

#[async_trait]
impl VideoPlayer for NoPlayer {
    async fn seek(&self, _seconds: f64) -> PlayerResult<()> {
        Err(PlayerError::Unavailable)
    }

    async fn play(&self) -> PlayerResult<()> {
        Err(PlayerError::Unavailable)
    }
}
