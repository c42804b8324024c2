use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use url::Url;

use super::{AnnotateRequest, AnnotateResponse, ImageResponse, VisionFeature};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for `images:annotate`, authenticated with an API key.
pub struct VisionClient {
    endpoint: Url,
    api_key: String,
    timeout: Duration,
}

impl VisionClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid vision endpoint {endpoint}"))?;
        if endpoint.scheme() != "https" && endpoint.scheme() != "http" {
            bail!("vision endpoint must be http(s), got {}", endpoint.scheme());
        }
        if api_key.trim().is_empty() {
            bail!("cloud vision API key is empty (set VISIONKIT_CLOUD_API_KEY)");
        }
        Ok(Self {
            endpoint,
            api_key: api_key.trim().to_string(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn annotate_file(
        &self,
        path: &Path,
        feature: VisionFeature,
        max_results: u32,
    ) -> Result<ImageResponse> {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        self.annotate(&bytes, feature, max_results)
    }

    /// Annotate encoded image bytes (JPEG, PNG, ...).
    pub fn annotate(
        &self,
        image: &[u8],
        feature: VisionFeature,
        max_results: u32,
    ) -> Result<ImageResponse> {
        let content = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::to_string(&AnnotateRequest::new(content, feature, max_results))
            .context("encode annotate request")?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);

        log::info!(
            "VisionClient: {} request ({} bytes) to {}",
            feature.api_name(),
            image.len(),
            self.endpoint
        );
        let response = match ureq::post(url.as_str())
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(anyhow!("vision API returned HTTP {code}: {detail}"));
            }
            Err(err) => return Err(err).context("send annotate request"),
        };

        let mut text = String::new();
        response
            .into_reader()
            .read_to_string(&mut text)
            .context("read annotate response")?;
        let parsed: AnnotateResponse =
            serde_json::from_str(&text).context("decode annotate response")?;
        parsed.into_single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::DEFAULT_ENDPOINT;

    #[test]
    fn rejects_bad_endpoint_and_empty_key() {
        assert!(VisionClient::new("ftp://example.com", "k").is_err());
        assert!(VisionClient::new("not a url", "k").is_err());
        assert!(VisionClient::new(DEFAULT_ENDPOINT, "  ").is_err());
        assert!(VisionClient::new(DEFAULT_ENDPOINT, "abc").is_ok());
    }
}
