use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

/// Output of a render: the final DOM, where navigation ended, and the base
/// URI relative links in the document resolve against.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: Url,
    pub base_uri: Url,
}

/// Turns a URL into rendered HTML. Timeouts around `render` are applied by
/// the caller, so implementations may block for as long as the page needs.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderedPage>;
}

/// Plain HTTP renderer. No JavaScript; the base URI honours `<base href>`.
pub struct HttpRenderer {
    client: Client,
    referer: Option<String>,
}

impl HttpRenderer {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .cookie_store(true)
            .referer(false)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            referer: None,
        })
    }

    /// Send `Referer: <scope root>` with every request.
    pub fn with_referer(mut self, referer: &Url) -> Self {
        self.referer = Some(referer.to_string());
        self
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage> {
        debug!("Fetching {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(referer) = &self.referer {
            request = request.header(reqwest::header::REFERER, referer);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::RenderFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        let base_uri = document_base_uri(&html, &final_url);

        Ok(RenderedPage {
            html,
            final_url,
            base_uri,
        })
    }
}

/// `document.baseURI` for a static document: the first `<base href>`
/// resolved against the final URL, or the final URL itself.
pub fn document_base_uri(html: &str, final_url: &Url) -> Url {
    let document = Html::parse_document(html);
    let selector = Selector::parse("base[href]").unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| final_url.join(href.trim()).ok())
        .unwrap_or_else(|| final_url.clone())
}

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;

#[cfg(feature = "browser")]
mod browser {
    use super::*;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::sync::Arc;
    use tracing::warn;

    /// Headless Chromium renderer. One browser is shared; each render opens
    /// and closes its own tab.
    pub struct BrowserRenderer {
        browser: Arc<Browser>,
        settle: Duration,
        _handler: tokio::task::JoinHandle<()>,
    }

    impl BrowserRenderer {
        pub async fn launch(settle: Duration, accept_invalid_certs: bool) -> Result<Self> {
            let mut builder = BrowserConfig::builder()
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-gpu")
                .arg(format!("--user-agent={}", DEFAULT_USER_AGENT))
                .window_size(1920, 1080);
            if accept_invalid_certs {
                builder = builder.arg("--ignore-certificate-errors");
            }
            let config = builder.build().map_err(|e| ScanError::RenderFailed {
                url: String::new(),
                reason: format!("browser config error: {e}"),
            })?;

            let (browser, mut handler) =
                Browser::launch(config)
                    .await
                    .map_err(|e| ScanError::RenderFailed {
                        url: String::new(),
                        reason: format!("browser launch failed: {e}"),
                    })?;
            let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

            Ok(Self {
                browser: Arc::new(browser),
                settle,
                _handler: handle,
            })
        }
    }

    #[async_trait]
    impl Renderer for BrowserRenderer {
        async fn render(&self, url: &Url) -> Result<RenderedPage> {
            let failed = |reason: String| ScanError::RenderFailed {
                url: url.to_string(),
                reason,
            };

            let page = self
                .browser
                .new_page(url.as_str())
                .await
                .map_err(|e| failed(format!("failed to open page: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| failed(format!("navigation failed: {e}")))?;
            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }

            let html = page
                .content()
                .await
                .map_err(|e| failed(format!("failed to read content: {e}")))?;
            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .and_then(|u| Url::parse(&u).ok())
                .unwrap_or_else(|| url.clone());
            let base_uri = page
                .evaluate("document.baseURI")
                .await
                .ok()
                .and_then(|v| v.into_value::<String>().ok())
                .and_then(|u| Url::parse(&u).ok())
                .unwrap_or_else(|| final_url.clone());

            if let Err(e) = page.close().await {
                warn!(url = %url, error = %e, "Page close error");
            }

            Ok(RenderedPage {
                html,
                final_url,
                base_uri,
            })
        }
    }
}
