//! Page fetchers: plain HTTP and a headless browser for script-heavy pages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use execadvisor_shared::{ExecAdvisorError, Result, ScrapeConfig};

/// Fetches the HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;

    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExecAdvisorError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ExecAdvisorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecAdvisorError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| ExecAdvisorError::Network(format!("{url}: body read failed: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// Headless browser
// ---------------------------------------------------------------------------

/// Renders pages with a headless Chromium and returns the resulting DOM.
pub struct BrowserFetcher {
    command: String,
    timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(
            config.browser_cmd.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, command = %self.command, "rendering page in browser");
        let run = Command::new(&self.command)
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--dump-dom",
                url.as_str(),
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                ExecAdvisorError::Network(format!(
                    "{url}: browser timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ExecAdvisorError::Network(format!(
                    "failed to start browser '{}': {e} (install Chromium or set scraper.browser_cmd)",
                    self.command
                ))
            })?;

        if !output.status.success() {
            return Err(ExecAdvisorError::Network(format!(
                "{url}: browser exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn browser_output_is_returned() {
        // `echo` stands in for the browser and prints its arguments.
        let fetcher = BrowserFetcher::new("echo", Duration::from_secs(5));
        let url = Url::parse("https://emba.unisg.ch/programm").unwrap();
        let dom = fetcher.fetch(&url).await.unwrap();
        assert!(dom.contains("--dump-dom https://emba.unisg.ch/programm"));
    }

    #[tokio::test]
    async fn missing_browser_is_an_error() {
        let fetcher = BrowserFetcher::new("execadvisor-no-such-browser", Duration::from_secs(5));
        let url = Url::parse("https://emba.unisg.ch/programm").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("failed to start browser"));
    }

    #[tokio::test]
    async fn http_errors_carry_status() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    fn test_config() -> ScrapeConfig {
        ScrapeConfig {
            base_url: "https://emba.unisg.ch/programm".into(),
            allowed_domain: "unisg.ch".into(),
            timeout_secs: 5,
            user_agent: "execadvisor-test".into(),
            rate_limit_ms: 0,
            use_browser: false,
            browser_cmd: "chromium".into(),
        }
    }
}
