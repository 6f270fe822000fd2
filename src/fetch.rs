use std::{sync::Arc, time::Duration};

use tracing::debug;
use wreq::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};

use crate::{
    config::{Config, RenderConfig},
    error::FetchError,
    robots::RobotsPolicy,
};

/// How a page is retrieved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchMode {
    /// One plain GET.
    Static,
    /// A scripted browser session that scrolls until lazy content settles.
    Rendered,
}

/// Anything that can turn a URL into document text.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        (**self).fetch(url, mode).await
    }
}

pub fn http_client(config: &Config) -> Result<wreq::Client, FetchError> {
    Ok(wreq::Client::builder().timeout(Duration::from_secs(config.http_timeout_secs)).build()?)
}

pub struct Fetcher {
    client: wreq::Client,
    policy: Arc<RobotsPolicy>,
    user_agent: String,
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    render: RenderConfig,
}

impl Fetcher {
    pub fn new(
        client: wreq::Client,
        policy: Arc<RobotsPolicy>,
        user_agent: String,
        render: RenderConfig,
    ) -> Self {
        Self { client, policy, user_agent, render }
    }

    async fn fetch_static(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type =
            resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
        if !is_html(content_type.as_deref()) {
            return Err(FetchError::ContentType(content_type));
        }

        let body = resp.text().await?;
        debug!(url = %url, bytes = body.len(), "fetched page");
        Ok(body)
    }

    #[cfg(feature = "browser")]
    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError> {
        browser::render(url, &self.user_agent, &self.render).await
    }

    #[cfg(not(feature = "browser"))]
    async fn fetch_rendered(&self, url: &str) -> Result<String, FetchError> {
        tracing::warn!(url = %url, "built without browser support, fetching listing statically");
        self.fetch_static(url).await
    }
}

impl PageSource for Fetcher {
    async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        if !self.policy.allowed(url) {
            return Err(FetchError::Disallowed);
        }
        match mode {
            FetchMode::Static => self.fetch_static(url).await,
            FetchMode::Rendered => self.fetch_rendered(url).await,
        }
    }
}

fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

/// A page that can be scrolled and measured.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) trait ScrollSurface {
    async fn height(&self) -> Result<i64, FetchError>;
    async fn scroll_to_bottom(&self) -> Result<(), FetchError>;
}

/// Scrolls to the bottom until the page height stops changing or
/// `max_attempts` scrolls have been made. Returns the number of scrolls.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub(crate) async fn scroll_until_stable<S: ScrollSurface>(
    surface: &S,
    max_attempts: u32,
    delay: Duration,
) -> Result<u32, FetchError> {
    let mut last_height = surface.height().await?;
    let mut scrolls = 0;

    while scrolls < max_attempts {
        surface.scroll_to_bottom().await?;
        scrolls += 1;
        tokio::time::sleep(delay).await;

        let height = surface.height().await?;
        if height == last_height {
            debug!(scrolls, height, "page height settled");
            break;
        }
        last_height = height;
    }

    Ok(scrolls)
}

#[cfg(feature = "browser")]
mod browser {
    use chromiumoxide::{
        Page,
        browser::{Browser, BrowserConfig},
    };
    use futures::StreamExt;
    use tracing::{debug, warn};

    use super::{ScrollSurface, scroll_until_stable};
    use crate::{config::RenderConfig, error::FetchError};

    impl ScrollSurface for Page {
        async fn height(&self) -> Result<i64, FetchError> {
            self.evaluate("document.body.scrollHeight")
                .await?
                .into_value::<i64>()
                .map_err(|e| FetchError::Script(e.to_string()))
        }

        async fn scroll_to_bottom(&self) -> Result<(), FetchError> {
            self.evaluate("window.scrollTo(0, document.body.scrollHeight); true").await?;
            Ok(())
        }
    }

    /// Runs one isolated headless session for `url`. The browser is closed
    /// on every exit path.
    pub(super) async fn render(
        url: &str,
        user_agent: &str,
        render: &RenderConfig,
    ) -> Result<String, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-gpu")
            .arg(format!("--user-agent={user_agent}"));
        if let Some(path) = &render.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(FetchError::BrowserConfig)?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = capture(&browser, url, render).await;

        if let Err(err) = browser.close().await {
            warn!(url = %url, error = %err, "browser close failed");
        }
        if let Err(err) = browser.wait().await {
            warn!(url = %url, error = %err, "browser did not exit cleanly");
        }
        events.abort();

        result
    }

    async fn capture(
        browser: &Browser,
        url: &str,
        render: &RenderConfig,
    ) -> Result<String, FetchError> {
        let page = browser.new_page(url).await?;
        page.wait_for_navigation().await?;

        let scrolls =
            scroll_until_stable(&page, render.scroll_attempts, render.scroll_delay()).await?;
        tokio::time::sleep(render.settle_delay()).await;

        let html = page.content().await?;
        debug!(url = %url, scrolls, bytes = html.len(), "rendered page");
        Ok(html)
    }
}
