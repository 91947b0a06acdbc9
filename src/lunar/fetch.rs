//! Document sources: the live sites over HTTP, or a directory of saved pages.

use crate::lunar::config::{FetchConfig, FengshuiConfig, SourcesConfig};
use crate::lunar::model::SourceKind;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, HeaderMap, HeaderValue};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_MIN_SECS: u64 = 2;
const BACKOFF_MAX_SECS: u64 = 10;

pub trait DocumentSource {
    /// UTF-8 page text for one source and day, or the fetch failure.
    fn fetch(&self, kind: SourceKind, date: NaiveDate) -> Result<String>;
}

pub fn primary_url(base: &str, date: NaiveDate) -> String {
    format!(
        "{}/xem-ngay-tot-xau-{:02}-{:02}-{}",
        base.trim_end_matches('/'),
        date.day(),
        date.month(),
        date.year()
    )
}

pub fn secondary_url(base: &str, date: NaiveDate) -> String {
    format!(
        "{}/?blog=xngay&d={:02}{:02}{}",
        base.trim_end_matches('/'),
        date.day(),
        date.month(),
        date.year()
    )
}

pub fn cache_path(dir: &Path, kind: SourceKind, date: NaiveDate) -> PathBuf {
    dir.join(kind.key()).join(format!("{date}.html"))
}

/// Wait before retry `attempt` (1-based): doubling, kept within 2..=10 seconds.
pub fn backoff(attempt: u32) -> Duration {
    let secs = 1u64
        .checked_shl(attempt)
        .unwrap_or(BACKOFF_MAX_SECS)
        .clamp(BACKOFF_MIN_SECS, BACKOFF_MAX_SECS);
    Duration::from_secs(secs)
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

pub struct HttpSource {
    client: Client,
    fetch: FetchConfig,
    sources: SourcesConfig,
    cache_dir: Option<PathBuf>,
}

impl HttpSource {
    /// `cache_dir` set means every fetched page is also saved for later offline runs.
    pub fn new(cfg: &FengshuiConfig, cache_dir: Option<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.fetch.timeout_secs))
            .user_agent(cfg.fetch.user_agent.clone())
            .default_headers(browser_headers())
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            fetch: cfg.fetch.clone(),
            sources: cfg.sources.clone(),
            cache_dir,
        })
    }

    pub fn url_for(&self, kind: SourceKind, date: NaiveDate) -> Result<String> {
        match kind {
            SourceKind::Primary => Ok(primary_url(&self.sources.primary_base_url, date)),
            SourceKind::Secondary => Ok(secondary_url(&self.sources.secondary_base_url, date)),
            SourceKind::Reference => bail!("the reference source is computed, not fetched"),
        }
    }

    fn polite_delay(&self) {
        let (min, max) = (self.fetch.delay_min_secs, self.fetch.delay_max_secs);
        if max <= 0.0 {
            return;
        }
        let secs = if min < max {
            rand::thread_rng().gen_range(min..=max)
        } else {
            max
        };
        thread::sleep(Duration::from_secs_f64(secs));
    }

    fn get_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        if !response.status().is_success() {
            bail!("fetch of {} failed with status {}", url, response.status());
        }
        response
            .text()
            .with_context(|| format!("failed to decode body from {url}"))
    }

    fn save_to_cache(&self, kind: SourceKind, date: NaiveDate, body: &str) -> Result<()> {
        let Some(dir) = &self.cache_dir else {
            return Ok(());
        };
        let path = cache_path(dir, kind, date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, kind: SourceKind, date: NaiveDate) -> Result<String> {
        let url = self.url_for(kind, date)?;
        self.polite_delay();

        let attempts = u32::try_from(self.fetch.max_retries).unwrap_or(u32::MAX).max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);
            match self.get_once(&url) {
                Ok(body) => {
                    if let Err(err) = self.save_to_cache(kind, date, &body) {
                        warn!("Could not cache {} page for {}: {:#}", kind.key(), date, err);
                    }
                    return Ok(body);
                }
                Err(err) => {
                    warn!("Fetch attempt {}/{} for {} failed: {:#}", attempt, attempts, url, err);
                    last_err = Some(err);
                    if attempt < attempts {
                        thread::sleep(backoff(attempt));
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no fetch attempt was made for {url}")))
    }
}

/// Pages saved as `<dir>/<source>/<YYYY-MM-DD>.html`.
pub struct CacheDirSource {
    dir: PathBuf,
}

impl CacheDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for CacheDirSource {
    fn fetch(&self, kind: SourceKind, date: NaiveDate) -> Result<String> {
        let path = cache_path(&self.dir, kind, date);
        if !path.exists() {
            bail!("no cached {} page for {} at {}", kind.key(), date, path.display());
        }
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    }
}
