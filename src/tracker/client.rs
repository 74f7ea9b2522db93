use reqwest::Client;

use super::error::TrackerError;
use super::response::ReportResponse;
use crate::config::ReportConfig;
use crate::constants::USER_AGENT;
use crate::info::InfoHash;

/// HTTP client for the byte counter report endpoint.
///
/// A report is a `GET` with `downloadbytes`, `uploadbytes` and `infohash`
/// (hex) query parameters. The body is a bencoded dictionary.
pub struct ReportClient {
    client: Client,
    url: String,
}

impl ReportClient {
    pub fn new(config: &ReportConfig) -> Result<Self, TrackerError> {
        let url = &config.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub async fn report(
        &self,
        info_hash: &InfoHash,
        downloaded: u64,
        uploaded: u64,
    ) -> Result<ReportResponse, TrackerError> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}downloadbytes={}&uploadbytes={}&infohash={}",
            self.url,
            separator,
            downloaded,
            uploaded,
            url_encode(info_hash.to_hex().as_bytes())
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT_ENCODING, "identity")
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        ReportResponse::from_bytes(&body)
    }

    /// Reports and returns the suggested download speed, or 0 on any
    /// failure. Failures are logged.
    pub async fn report_speed(&self, info_hash: &InfoHash, downloaded: u64, uploaded: u64) -> u64 {
        match self.report(info_hash, downloaded, uploaded).await {
            Ok(response) => response.download_speed_or_zero(),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "byte counter report failed");
                0
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub(crate) fn url_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.' || b == b'~' {
                format!("{}", b as char)
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}
