use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub base_url: String,
    pub start_url: String,
    pub crawl_delay_ms: u64,
    /// `None` means no page budget.
    pub max_pages: Option<usize>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub render: RenderConfig,
}

/// Knobs for the scripted-browser fetch of listing pages.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub scroll_attempts: u32,
    pub scroll_delay_ms: u64,
    pub settle_ms: u64,
    pub chrome_executable: Option<PathBuf>,
}

impl RenderConfig {
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port: u16 = var("PORT", "3000").parse().context("PORT")?;

        let database_url = var("DATABASE_URL", "sqlite://cinecrawl.db?mode=rwc");
        let base_url = var("BASE_URL", "https://www.imdb.com").trim_end_matches('/').to_string();
        let start_url = var("START_URL", "https://www.imdb.com/chart/top/?ref_=nv_mv_250");

        let crawl_delay_ms: u64 = var("CRAWL_DELAY_MS", "2000").parse().context("CRAWL_DELAY_MS")?;
        let max_pages: usize = var("MAX_PAGES", "10").parse().context("MAX_PAGES")?;
        let http_timeout_secs: u64 =
            var("HTTP_TIMEOUT_SECS", "30").parse().context("HTTP_TIMEOUT_SECS")?;
        let user_agent = var("USER_AGENT", DESKTOP_USER_AGENT);

        let render = RenderConfig {
            scroll_attempts: var("RENDER_SCROLL_ATTEMPTS", "5")
                .parse()
                .context("RENDER_SCROLL_ATTEMPTS")?,
            scroll_delay_ms: var("RENDER_SCROLL_DELAY_MS", "1000")
                .parse()
                .context("RENDER_SCROLL_DELAY_MS")?,
            settle_ms: var("RENDER_SETTLE_MS", "2000").parse().context("RENDER_SETTLE_MS")?,
            chrome_executable: lookup("CHROME_EXECUTABLE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            base_url,
            start_url,
            crawl_delay_ms,
            max_pages: (max_pages > 0).then_some(max_pages),
            http_timeout_secs,
            user_agent,
            render,
        })
    }

    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_the_top_chart() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.base_url, "https://www.imdb.com");
        assert!(config.start_url.starts_with("https://www.imdb.com/chart/top/"));
        assert_eq!(config.max_pages, Some(10));
        assert_eq!(config.crawl_delay(), Duration::from_secs(2));
        assert_eq!(config.render.scroll_attempts, 5);
        assert!(config.render.chrome_executable.is_none());
    }

    #[test]
    fn zero_budget_means_unbounded() {
        let config = config_with(&[("MAX_PAGES", "0")]).unwrap();
        assert_eq!(config.max_pages, None);
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let config = config_with(&[("BASE_URL", "http://localhost:8080/")]).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = config_with(&[("CRAWL_DELAY_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CRAWL_DELAY_MS"));
    }
}
