//! Headless browser rendering with tiled screenshots.
//!
//! The renderer is an explicitly owned resource handle: the browser launches
//! lazily on the first render and is torn down once by `shutdown()` at the
//! end of a run. Concurrent callers each open their own page within the one
//! browser instance.

use async_trait::async_trait;

use crate::error::FetchError;

/// Height of one screenshot tile in pixels.
pub const TILE_HEIGHT: u32 = 900;
/// Vertical overlap between tiles, so table rows are not cut off.
pub const TILE_OVERLAP: u32 = 100;
/// Cap on tiles per page to bound vision cost.
pub const MAX_TILES: usize = 5;
/// Browser viewport width.
pub const VIEWPORT_WIDTH: u32 = 1280;

/// Output of a rendered page load.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// PNG tiles, top of page first.
    pub screenshots: Vec<Vec<u8>>,
}

/// Headless page rendering for JS-heavy sites.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load the URL in a browser page, wait out bot interstitials, and
    /// return the rendered DOM plus tiled screenshots.
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError>;

    /// Release browser resources. Called once at end of run.
    async fn shutdown(&self) {}
}

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

#[cfg(feature = "render")]
mod headless {
    use super::*;

    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tracing::{debug, warn};

    /// Marker emitted by bot-challenge interstitials while they spin.
    const CHALLENGE_MARKER: &str = "Just a moment";

    /// Chromium-backed renderer: one browser per run, one page per call.
    pub struct HeadlessRenderer {
        browser: Mutex<Option<Browser>>,
        nav_timeout: Duration,
    }

    impl Default for HeadlessRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self {
                browser: Mutex::new(None),
                nav_timeout: Duration::from_secs(30),
            }
        }

        pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
            self.nav_timeout = timeout;
            self
        }

        async fn launch() -> Result<Browser, FetchError> {
            let config = BrowserConfig::builder()
                .window_size(VIEWPORT_WIDTH, TILE_HEIGHT)
                .build()
                .map_err(FetchError::Render)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| FetchError::Render(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!(error = %e, "browser handler stopped");
                        break;
                    }
                }
            });

            Ok(browser)
        }

        /// Open a fresh page, launching the browser on first use.
        async fn new_page(&self) -> Result<Page, FetchError> {
            let mut guard = self.browser.lock().await;
            if guard.is_none() {
                debug!("launching headless browser");
                *guard = Some(Self::launch().await?);
            }
            let browser = guard
                .as_ref()
                .ok_or_else(|| FetchError::Render("browser unavailable".to_string()))?;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::Render(e.to_string()))
        }

        /// Poll past bot-challenge interstitials, up to ~10s.
        async fn wait_out_challenge(page: &Page) {
            for _ in 0..5 {
                let content = match page.content().await {
                    Ok(content) => content,
                    Err(_) => return,
                };
                if !content.contains(CHALLENGE_MARKER) && content.len() > 1000 {
                    return;
                }
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }

        async fn capture_tiles(page: &Page, url: &str) -> Vec<Vec<u8>> {
            let page_height = page
                .evaluate("document.body.scrollHeight")
                .await
                .ok()
                .and_then(|value| value.into_value::<f64>().ok())
                .unwrap_or(TILE_HEIGHT as f64);

            let stride = (TILE_HEIGHT - TILE_OVERLAP) as f64;
            let mut offsets = Vec::new();
            let mut y = 0.0;
            while y < page_height && offsets.len() < MAX_TILES {
                offsets.push(y);
                y += stride;
            }
            if y < page_height {
                warn!(
                    url,
                    tiles = MAX_TILES,
                    page_height,
                    "page taller than tile budget; content below the fold not captured"
                );
            }

            let mut screenshots = Vec::with_capacity(offsets.len());
            for offset in offsets {
                if page
                    .evaluate(format!("window.scrollTo(0, {offset})"))
                    .await
                    .is_err()
                {
                    break;
                }
                // Let the scroll render settle before capturing.
                tokio::time::sleep(Duration::from_millis(300)).await;
                match page
                    .screenshot(
                        ScreenshotParams::builder()
                            .format(CaptureScreenshotFormat::Png)
                            .build(),
                    )
                    .await
                {
                    Ok(bytes) => screenshots.push(bytes),
                    Err(e) => {
                        warn!(url, error = %e, "screenshot capture failed");
                        break;
                    }
                }
            }
            screenshots
        }
    }

    #[async_trait]
    impl Renderer for HeadlessRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
            let page = self.new_page().await?;

            let navigated = tokio::time::timeout(self.nav_timeout, page.goto(url)).await;
            match navigated {
                Ok(Ok(_)) => {
                    // Wait for network idle; fall back to a fixed settle delay.
                    if tokio::time::timeout(self.nav_timeout, page.wait_for_navigation())
                        .await
                        .is_err()
                    {
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                }
                Ok(Err(e)) => {
                    page.close().await.ok();
                    return Err(FetchError::Render(e.to_string()));
                }
                Err(_) => {
                    page.close().await.ok();
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
            }

            Self::wait_out_challenge(&page).await;

            let html = match page.content().await {
                Ok(html) => html,
                Err(e) => {
                    page.close().await.ok();
                    return Err(FetchError::Render(e.to_string()));
                }
            };

            let screenshots = Self::capture_tiles(&page, url).await;
            page.close().await.ok();

            Ok(RenderedPage { html, screenshots })
        }

        async fn shutdown(&self) {
            let mut guard = self.browser.lock().await;
            if let Some(mut browser) = guard.take() {
                if let Err(e) = browser.close().await {
                    debug!(error = %e, "browser close failed");
                }
                let _ = browser.wait().await;
            }
        }
    }
}
