//! Program scraper engine.
//!
//! Fetches the program overview page, discovers links to program pages,
//! and fetches and parses each one sequentially with a delay in between.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use execadvisor_shared::{ExecAdvisorError, RawProgram, Result, ScrapeConfig};

use crate::fetcher::{BrowserFetcher, HttpFetcher, PageFetcher};
use crate::parser::ProgramParser;

/// Link selectors in order of precedence; the first one with matches wins.
const LINK_SELECTORS: [&str; 6] = [
    "a.program-link",
    "a[href*='program']",
    "a[href*='emba']",
    ".program a",
    ".course a",
    "a",
];

// ---------------------------------------------------------------------------
// ScrapeResult
// ---------------------------------------------------------------------------

/// Summary of a completed scrape.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub programs: Vec<RawProgram>,
    pub pages_fetched: usize,
    /// Pages skipped as already visited, blocked, or failed.
    pub pages_skipped: usize,
    /// `(url, message)` for every page that failed.
    pub errors: Vec<(String, String)>,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Scraper
// ---------------------------------------------------------------------------

pub struct Scraper {
    config: ScrapeConfig,
    http: Box<dyn PageFetcher>,
    browser: Option<Box<dyn PageFetcher>>,
    parser: ProgramParser,
    /// Allow localhost/private IPs (for tests against mock servers).
    allow_localhost: bool,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let http = HttpFetcher::new(&config)?;
        let browser: Option<Box<dyn PageFetcher>> = if config.use_browser {
            Some(Box::new(BrowserFetcher::from_config(&config)))
        } else {
            None
        };
        Ok(Self {
            http: Box::new(http),
            browser,
            parser: ProgramParser::new(),
            allow_localhost: false,
            config,
        })
    }

    /// Replace the browser fallback.
    pub fn with_browser(mut self, browser: Box<dyn PageFetcher>) -> Self {
        self.browser = Some(browser);
        self
    }

    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Fetch with HTTP, falling back to the browser when one is configured.
    async fn fetch(&self, url: &Url) -> Result<String> {
        match self.http.fetch(url).await {
            Ok(html) => Ok(html),
            Err(e) => match &self.browser {
                Some(browser) => {
                    warn!(%url, error = %e, fallback = browser.name(), "http fetch failed");
                    browser.fetch(url).await
                }
                None => Err(e),
            },
        }
    }

    fn check_target(&self, url: &Url) -> Result<()> {
        if !self.allow_localhost && is_ssrf_target(url) {
            return Err(ExecAdvisorError::validation(format!(
                "refusing to fetch private address {url}"
            )));
        }
        Ok(())
    }

    /// Scrape every program linked from the configured base page.
    #[instrument(skip_all, fields(base_url = %self.config.base_url))]
    pub async fn scrape(&self) -> Result<ScrapeResult> {
        let started = Instant::now();
        let base = Url::parse(&self.config.base_url).map_err(|e| {
            ExecAdvisorError::config(format!("invalid base_url '{}': {e}", self.config.base_url))
        })?;
        self.check_target(&base)?;

        info!("fetching program overview");
        let overview = self.fetch(&base).await?;
        let links = discover_links(&overview, &base, &self.config.allowed_domain);
        info!(links = links.len(), "program links discovered");

        let mut visited = HashSet::new();
        let mut programs = Vec::new();
        let mut errors = Vec::new();
        let mut pages_skipped = 0;
        let mut first = true;

        for link in links {
            if !visited.insert(normalize_url(&link)) {
                pages_skipped += 1;
                continue;
            }
            if let Err(e) = self.check_target(&link) {
                warn!(url = %link, "SSRF protection: blocked");
                errors.push((link.to_string(), e.to_string()));
                pages_skipped += 1;
                continue;
            }

            if !first && self.config.rate_limit_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.rate_limit_ms)).await;
            }
            first = false;

            match self.fetch(&link).await {
                Ok(html) => programs.push(self.parser.parse(&html, link.as_str())),
                Err(e) => {
                    warn!(url = %link, error = %e, "failed to fetch program page");
                    errors.push((link.to_string(), e.to_string()));
                    pages_skipped += 1;
                }
            }
        }

        let result = ScrapeResult {
            pages_fetched: programs.len(),
            programs,
            pages_skipped,
            errors,
            duration: started.elapsed(),
        };
        info!(
            pages_fetched = result.pages_fetched,
            pages_skipped = result.pages_skipped,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis(),
            "scrape completed"
        );
        Ok(result)
    }
}

/// Write scraped programs as pretty JSON, creating parent directories.
pub fn save_raw(programs: &[RawProgram], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExecAdvisorError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(programs)
        .map_err(|e| ExecAdvisorError::Conversion(format!("failed to encode programs: {e}")))?;
    std::fs::write(path, json).map_err(|e| ExecAdvisorError::io(path, e))?;
    info!(programs = programs.len(), path = %path.display(), "saved raw programs");
    Ok(())
}

// ---------------------------------------------------------------------------
// Link discovery
// ---------------------------------------------------------------------------

/// Program page links on an overview page, absolute and deduplicated.
pub fn discover_links(html: &str, base: &Url, allowed_domain: &str) -> Vec<Url> {
    let doc = Html::parse_document(html);

    let Some((css, elements)) = LINK_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let found: Vec<_> = doc.select(&selector).collect();
        (!found.is_empty()).then_some((*css, found))
    }) else {
        warn!("no links found with any selector");
        return Vec::new();
    };
    debug!(selector = css, found = elements.len(), "link selector chosen");

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in elements {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }
        let Ok(mut url) = base.join(href) else {
            continue;
        };
        url.set_fragment(None);
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        if !url.host_str().is_some_and(|h| host_allowed(h, allowed_domain)) {
            continue;
        }
        if seen.insert(url.to_string()) {
            links.push(url);
        }
    }
    links
}

/// The domain itself or one of its subdomains.
fn host_allowed(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Normalize a URL for deduplication (no fragment, no trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Whether a URL targets a local or private resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
