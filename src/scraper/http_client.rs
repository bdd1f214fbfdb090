use crate::config::ScraperConfig;
use crate::scraper::error::ScrapeError;
use crate::scraper::{FetchedPage, PageFetcher, PageRequest};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(10);

pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        // Cookies are deliberately not stored on the client: each walk carries its
        // own session in the Cookie header so walks never share server state.
        let inner = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // The listing host presents a certificate chain that does not verify.
            // Accepting it is a conscious trust reduction for a public, read-only page.
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    async fn send_once(
        &self,
        request: &PageRequest,
        cookie: Option<&str>,
    ) -> Result<FetchedPage, ScrapeError> {
        let url = self.config.base_url.as_str();

        let mut builder = match request {
            PageRequest::Initial => {
                debug!("GET {}", url);
                self.inner.get(url)
            }
            PageRequest::Postback(form) => {
                let body = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(form.iter())
                    .finish();
                debug!("POST {} ({} form fields, {} bytes)", url, form.len(), body.len());
                self.inner
                    .post(url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body)
            }
        };

        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = resp.text().await?;
        Ok(FetchedPage { body, set_cookies })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    /// One page, retried with jittered exponential backoff on transient failures.
    async fn fetch_page(
        &self,
        request: &PageRequest,
        cookie: Option<&str>,
    ) -> Result<FetchedPage, ScrapeError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor((self.config.retry_base_ms / 2).max(1))
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.config.max_retries as usize);

        RetryIf::start(
            strategy,
            || self.send_once(request, cookie),
            |e: &ScrapeError| {
                let retry = e.is_transient();
                if retry {
                    warn!("Transient fetch error, retrying: {}", e);
                }
                retry
            },
        )
        .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
