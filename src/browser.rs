// src/browser.rs
//! The host page: a YouTube watch page in a Chromium tab driven over CDP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page, handler::viewport::Viewport};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Duration, sleep},
};
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::error::{PlayerError, PlayerResult};
use crate::js_scripts;
use crate::player::{VideoPlayer, VideoSource, watch_url};

pub struct WatchPage {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    // Chromium profile; removed when the page is dropped.
    _profile: TempDir,
}

impl WatchPage {
    /// Launches Chromium and opens the watch page for `video_id`.
    pub async fn open(config: &AssistantConfig, video_id: &str) -> Result<Self> {
        let profile = tempfile::Builder::new()
            .prefix("ytrag-profile-")
            .tempdir()
            .context("failed to create browser profile directory")?;

        let (browser, mut handler) = Browser::launch(config_browser(config.headless, &profile)?)
            .await
            .context("failed to launch Chromium")?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let url = watch_url(video_id);
        info!(%url, "opening watch page");
        let page = browser.new_page(url.as_str()).await?;
        page.wait_for_navigation_response().await?;

        if let Err(err) = wait_for_selector(&page, js_scripts::VIDEO_SELECTOR).await {
            warn!("{err:#}; seeking will be unavailable until a video loads");
        }

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            _profile: profile,
        })
    }

    pub async fn title(&self) -> String {
        match self.page.evaluate(js_scripts::VIDEO_TITLE).await {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(err) => {
                debug!("title lookup failed: {err}");
                String::new()
            }
        }
    }

    pub async fn close(&self) {
        self.page.clone().close().await.ok();
        let mut browser = self.browser.lock().await;
        browser.close().await.ok();
        let _ = browser.kill().await;
        self.handler.abort();
    }

    async fn run_script(&self, script: &str) -> PlayerResult<()> {
        let found: bool = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PlayerError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| PlayerError::Script(e.to_string()))?;
        if found {
            Ok(())
        } else {
            Err(PlayerError::Unavailable)
        }
    }
}

#[async_trait]
impl VideoSource for WatchPage {
    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }
}

#[async_trait]
impl VideoPlayer for WatchPage {
    async fn seek(&self, seconds: f64) -> PlayerResult<()> {
        self.run_script(&js_scripts::seek_video(seconds)).await
    }

    async fn play(&self) -> PlayerResult<()> {
        self.run_script(js_scripts::PLAY_VIDEO).await
    }
}

fn config_browser(headless: bool, profile: &TempDir) -> Result<BrowserConfig> {
    let builder = BrowserConfig::builder();
    let builder = if headless {
        builder.headless_mode(chromiumoxide::browser::HeadlessMode::True)
    } else {
        builder.with_head()
    };

    builder
        .user_data_dir(profile.path())
        .args([
            "--remote-debugging-port=0",
            "--disable-popup-blocking",
            "--disable-crash-reporter",
            "--disable-sync-preferences",
            "--disable-background-timer-throttling",
            "--disable-renderer-backgrounding",
            "--disable-dev-shm-usage",
            "--disable-default-apps",
            "--disable-sync",
            "--disable-translate",
            "--no-first-run",
            "--disable-backgrounding-occluded-windows",
            "--autoplay-policy=no-user-gesture-required",
            "--disable-blink-features=AutomationControlled", // Hides automation
            "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
              AppleWebKit/537.36 (KHTML, like Gecko) \
              Chrome/133.0.0.0 Safari/537.36",
        ])
        .viewport(Some(Viewport {
            width: 1280,
            height: 720,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        }))
        .build()
        .map_err(anyhow::Error::msg)
}

async fn wait_for_selector(page: &Page, selector: &str) -> Result<()> {
    for _ in 0..10 {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        sleep(Duration::from_secs(2)).await;
    }
    anyhow::bail!("selector `{}` not found", selector)
}
