//! NSE historical data fetcher.
//!
//! The provider only serves the CSV endpoint to sessions that already hold
//! the anti-bot cookies set by its landing page, so every fetch is two GETs
//! on one fresh cookie-carrying client: homepage first, then the API call.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DataConfig, ProviderConfig};
use crate::domain::TriggerRequest;
use crate::error::FetchError;

/// Bytes inspected when checking for an HTML error page
const SNIFF_LEN: usize = 100;

pub struct NseFetcher {
    provider: ProviderConfig,
    data: DataConfig,
}

impl NseFetcher {
    pub fn new(provider: ProviderConfig, data: DataConfig) -> Self {
        Self { provider, data }
    }

    /// Download the CSV for `request` into the data folder and return its path
    pub async fn fetch(&self, request: &TriggerRequest) -> Result<PathBuf, FetchError> {
        request.validate()?;
        let symbol = request.symbol.to_uppercase();

        info!(
            "Fetching NSE data: {} ({} → {})",
            symbol, request.from_date, request.to_date
        );

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(self.provider.timeout())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;

        self.acquire_cookies(&client, &jar).await?;
        let body = self.download_csv(&client, request, &symbol).await?;

        let filename = self
            .data
            .payload_filename(&symbol, &request.from_date, &request.to_date);
        let path = self.data.folder.join(filename);
        store_payload(&path, &body).await?;

        info!(
            "CSV saved: {} ({} bytes)",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            body.len()
        );
        Ok(path)
    }

    /// Step 1: landing page visit to populate the cookie jar
    async fn acquire_cookies(&self, client: &Client, jar: &Jar) -> Result<(), FetchError> {
        let homepage = &self.provider.homepage_url;
        debug!("Acquiring NSE cookies from {}", homepage);

        let response = client
            .get(homepage)
            .header(USER_AGENT, self.provider.user_agent())
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, self.provider.accept_language())
            .send()
            .await
            .map_err(|e| FetchError::from_transport(e, self.provider.timeout_seconds))?;

        classify_status(&response, "NSE homepage")?;

        let url = Url::parse(homepage)
            .map_err(|e| FetchError::InvalidRequest(format!("bad homepage URL {homepage}: {e}")))?;
        if jar.cookies(&url).is_none() {
            return Err(FetchError::NoCookies(homepage.clone()));
        }

        Ok(())
    }

    /// Step 2: parameterized API call on the same session
    async fn download_csv(
        &self,
        client: &Client,
        request: &TriggerRequest,
        symbol: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let params = [
            ("from", request.from_date.as_str()),
            ("to", request.to_date.as_str()),
            ("symbol", symbol),
            ("type", self.provider.report_type.as_str()),
            ("series", self.provider.series.as_str()),
            ("csv", "true"),
        ];
        debug!("Calling NSE API with params: {:?}", params);

        let response = client
            .get(self.provider.api_url())
            .headers(self.api_headers())
            .query(&params)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(e, self.provider.timeout_seconds))?;

        classify_status(&response, "NSE API")?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(e, self.provider.timeout_seconds))?;

        if looks_like_html(&body) {
            return Err(FetchError::MalformedPayload(
                "Received HTML instead of CSV (possible error page)".to_string(),
            ));
        }

        Ok(body.to_vec())
    }

    fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.provider.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Skipping invalid provider header: {}", name),
            }
        }
        headers
    }
}

fn classify_status(response: &Response, target: &str) -> Result<(), FetchError> {
    let status = response.status();
    match status {
        StatusCode::FORBIDDEN => Err(FetchError::AccessDenied(format!(
            "{target} blocked the request"
        ))),
        StatusCode::NOT_FOUND => Err(FetchError::NotFound(format!(
            "{target}: invalid symbol or date range"
        ))),
        s if !s.is_success() => Err(FetchError::Http {
            status: s.as_u16(),
            url: response.url().to_string(),
        }),
        _ => Ok(()),
    }
}

/// The provider answers soft failures with an HTML page and a 200.
pub fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(SNIFF_LEN)];
    let lowered = String::from_utf8_lossy(head).to_lowercase();
    lowered.contains("<html") || lowered.contains("<!doctype")
}

/// Write to a `.part` sibling first, then rename into place.
async fn store_payload(path: &Path, body: &[u8]) -> Result<(), FetchError> {
    let storage_err = |reason: String| FetchError::Storage {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_err(e.to_string()))?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, body).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(storage_err(e.to_string()));
    }

    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(storage_err(e.to_string()));
    }

    Ok(())
}
