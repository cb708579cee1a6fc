//! Azure Computer Vision Read API client.

use crate::recognizer::TextExtractor;
use failure::Fail;
use log::{debug, error, info, warn};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

const ANALYZE_PATH: &str = "vision/v3.2/read/analyze";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const RETRY_DELAY: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Fail)]
pub enum OcrError {
    #[fail(display = "Azure OCR request failed with HTTP {}: {}", _0, _1)]
    Status(u16, String),
    #[fail(display = "Azure OCR response missing Operation-Location header")]
    MissingOperation,
}

pub struct AzureOcr {
    client: reqwest::Client,
    analyze_url: Url,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
    poll_interval: Duration,
}

impl AzureOcr {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<AzureOcr, failure::Error> {
        let mut base = endpoint.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let analyze_url = Url::parse(&base)
            .and_then(|u| u.join(ANALYZE_PATH))
            .map_err(|e| format_err!("Invalid Azure endpoint '{}': {}", endpoint, e))?;
        Ok(AzureOcr {
            client: reqwest::Client::new(),
            analyze_url,
            api_key: api_key.to_string(),
            timeout,
            max_retries: max_retries.max(1),
            poll_interval: POLL_INTERVAL,
        })
    }

    async fn read(&self, image: &[u8]) -> Result<Vec<String>, failure::Error> {
        let response = self
            .client
            .post(self.analyze_url.clone())
            .header(KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Status(status.as_u16(), body).into());
        }
        let operation = response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .ok_or(OcrError::MissingOperation)?;
        let operation = Url::parse(operation)?;
        debug!("Polling Azure OCR operation {}", operation);
        self.poll(operation).await
    }

    async fn poll(&self, operation: Url) -> Result<Vec<String>, failure::Error> {
        let start = Instant::now();
        loop {
            let response = self
                .client
                .get(operation.clone())
                .header(KEY_HEADER, &self.api_key)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OcrError::Status(status.as_u16(), body).into());
            }
            let result: Value = response.json().await?;
            match result["status"].as_str() {
                Some("succeeded") => return Ok(parse_read_result(&result)),
                Some("failed") => {
                    error!("Azure OCR processing failed");
                    return Ok(Vec::new());
                }
                _ => {}
            }
            if start.elapsed() > self.timeout {
                warn!("OCR processing timeout after {:?}", self.timeout);
                return Ok(Vec::new());
            }
            sleep(self.poll_interval).await;
        }
    }
}

impl TextExtractor for AzureOcr {
    async fn extract_text(&self, image: &[u8]) -> Result<Vec<String>, failure::Error> {
        let mut attempt = 1;
        loop {
            match self.read(image).await {
                Ok(lines) => {
                    info!("Azure OCR returned {} lines", lines.len());
                    return Ok(lines);
                }
                Err(e) if attempt >= self.max_retries => {
                    error!("OCR failed after {} attempts: {}", self.max_retries, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("OCR attempt {} failed: {}", attempt, e);
                    attempt += 1;
                    sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Collects every recognized line, cleaned. Lines that look like a plate
/// (8 to 15 characters with a digit) are moved to the front.
pub fn parse_read_result(result: &Value) -> Vec<String> {
    let mut texts = Vec::new();
    let pages = result["analyzeResult"]["readResults"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    for page in pages {
        let lines = page["lines"].as_array().map(Vec::as_slice).unwrap_or_default();
        for line in lines {
            let text = match line["text"].as_str() {
                Some(text) => text.trim().replace(' ', "").to_uppercase(),
                None => continue,
            };
            let len = text.chars().count();
            if (8..=15).contains(&len) && text.chars().any(|c| c.is_ascii_digit()) {
                texts.insert(0, text);
            } else {
                texts.push(text);
            }
        }
    }
    texts
}
