use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;
use wreq::header::USER_AGENT;

use crate::error::FetchError;

/// The site's crawling policy as it applies to the wildcard user agent.
///
/// Loaded once when a crawl starts and shared by the fetcher and the
/// traversal; evaluating it never touches the network.
#[derive(Clone, Debug, Default)]
pub struct RobotsPolicy {
    rules: Vec<Rule>,
}

#[derive(Clone, Debug)]
struct Rule {
    allow: bool,
    pattern: Regex,
}

impl RobotsPolicy {
    /// Fetches `{base_url}/robots.txt`. Transport errors and server errors
    /// are returned to the caller, which treats them as fatal. A 401/403
    /// denies everything; any other client error means there is no policy.
    pub async fn load(
        client: &wreq::Client,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let robots_url = format!("{}/robots.txt", base_url.trim_end_matches('/'));
        debug!(url = %robots_url, "loading robots policy");

        let resp = client.get(&robots_url).header(USER_AGENT, user_agent).send().await?;
        let status = resp.status().as_u16();

        let policy = match status {
            200..=299 => Self::parse(&resp.text().await?),
            401 | 403 => {
                warn!(url = %robots_url, status, "robots policy is access-restricted, denying all");
                Self::deny_all()
            },
            400..=499 => {
                info!(url = %robots_url, status, "no robots policy published, allowing all");
                Self::default()
            },
            _ => return Err(FetchError::Status(status)),
        };

        info!(url = %robots_url, rules = policy.rules.len(), "robots policy loaded");
        Ok(policy)
    }

    /// Parses a robots.txt body, keeping only the groups that name `*`.
    pub fn parse(content: &str) -> Self {
        let mut rules = Vec::new();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_string());
                },
                "allow" | "disallow" => {
                    in_rules = true;
                    if value.is_empty() || !group_agents.iter().any(|a| a == "*") {
                        continue;
                    }
                    if let Some(pattern) = path_pattern(value) {
                        rules.push(Rule { allow: key == "allow", pattern });
                    }
                },
                _ => {},
            }
        }

        Self { rules }
    }

    fn deny_all() -> Self {
        Self::parse("User-agent: *\nDisallow: /")
    }

    /// First matching rule decides; no match allows.
    pub fn allowed(&self, url: &str) -> bool {
        let path = match Url::parse(url) {
            Ok(parsed) => match parsed.query() {
                Some(query) => format!("{}?{}", parsed.path(), query),
                None => parsed.path().to_string(),
            },
            Err(_) => url.to_string(),
        };

        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&path))
            .map(|rule| rule.allow)
            .unwrap_or(true)
    }
}

/// Turns a robots path (with `*` and trailing `$` wildcards) into an
/// anchored prefix regex.
fn path_pattern(path: &str) -> Option<Regex> {
    let (path, anchored_end) = match path.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (path, false),
    };
    let mut pattern = format!("^{}", regex::escape(path).replace(r"\*", ".*"));
    if anchored_end {
        pattern.push('$');
    }
    Regex::new(&pattern).ok()
}
