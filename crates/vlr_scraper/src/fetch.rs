//! HTTP fetch layer with browser impersonation.
//!
//! vlr.gg serves plain HTML to anything that looks like a desktop browser.
//! Every request picks ONE profile from a fixed pool; all impersonation
//! headers of that request come from the same profile, never mixed.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::util::absolutize;

pub const VLR_BASE_URL: &str = "https://www.vlr.gg";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// One coherent browser identity.
#[derive(Debug, Clone, Copy)]
pub struct UserAgentProfile {
    pub user_agent: &'static str,
    /// Value for `sec-ch-ua-platform` (sent quoted).
    pub platform: &'static str,
    /// `None` for browsers that do not send client hints (Firefox, Safari).
    pub sec_ch_ua: Option<&'static str>,
}

pub const USER_AGENT_PROFILES: [UserAgentProfile; 10] = [
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        platform: "Windows",
        sec_ch_ua: Some("\"Not/A)Brand\";v=\"8\", \"Chromium\";v=\"126\", \"Google Chrome\";v=\"126\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
        platform: "macOS",
        sec_ch_ua: Some("\"Google Chrome\";v=\"125\", \"Chromium\";v=\"125\", \"Not.A/Brand\";v=\"24\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        platform: "Linux",
        sec_ch_ua: Some("\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
        platform: "Windows",
        sec_ch_ua: Some("\"Not/A)Brand\";v=\"8\", \"Chromium\";v=\"126\", \"Microsoft Edge\";v=\"126\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0",
        platform: "macOS",
        sec_ch_ua: Some("\"Microsoft Edge\";v=\"125\", \"Chromium\";v=\"125\", \"Not.A/Brand\";v=\"24\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 OPR/111.0.0.0",
        platform: "Windows",
        sec_ch_ua: Some("\"Opera\";v=\"111\", \"Chromium\";v=\"125\", \"Not.A/Brand\";v=\"24\""),
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
        platform: "Windows",
        sec_ch_ua: None,
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0",
        platform: "Linux",
        sec_ch_ua: None,
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:127.0) Gecko/20100101 Firefox/127.0",
        platform: "macOS",
        sec_ch_ua: None,
    },
    UserAgentProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        platform: "macOS",
        sec_ch_ua: None,
    },
];

/// Something that can fetch one page of the target site. The pagination
/// walker, the scoreboard assembly and the lifecycle manager are generic
/// over this so tests can feed them synthetic pages.
pub trait PageFetcher: Send + Sync {
    /// Site root used to resolve relative hrefs.
    fn base_url(&self) -> &str;

    /// Fetch one page as HTML. `url` may be absolute or site-relative.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone)]
pub struct VlrClient {
    client: reqwest::Client,
    base_url: String,
}

impl VlrClient {
    pub fn new() -> Self {
        Self::with_base_url(VLR_BASE_URL)
    }

    /// Point the client at a different site root (mirrors, test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for VlrClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for VlrClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let url = absolutize(&self.base_url, url);
        let profile = random_profile();
        debug!("GET {} [{}]", url, profile.user_agent);

        let mut request = self
            .client
            .get(&url)
            .header("accept", ACCEPT)
            .header("accept-language", ACCEPT_LANGUAGE)
            .header("cache-control", "max-age=0")
            .header("priority", "u=0, i")
            .header("sec-fetch-dest", "document")
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-site", "none")
            .header("sec-fetch-user", "?1")
            .header("sec-gpc", "1")
            .header("upgrade-insecure-requests", "1")
            .header("user-agent", profile.user_agent);
        if let Some(hints) = profile.sec_ch_ua {
            request = request
                .header("sec-ch-ua", hints)
                .header("sec-ch-ua-mobile", "?0")
                .header("sec-ch-ua-platform", format!("\"{}\"", profile.platform));
        }

        let response = request.send().await.map_err(|source| ScrapeError::Fetch {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status { url, status });
        }

        response
            .text()
            .await
            .map_err(|source| ScrapeError::Fetch { url, source })
    }
}

fn random_profile() -> &'static UserAgentProfile {
    let idx = rand::thread_rng().gen_range(0..USER_AGENT_PROFILES.len());
    &USER_AGENT_PROFILES[idx]
}
