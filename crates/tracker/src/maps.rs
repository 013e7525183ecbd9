use anyhow::Context;
use models::flightaware::FlightDetail;
use std::time::Duration;

/// Image is a rendered attachment of an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// MapRenderer draws the position and track of a flight.
#[async_trait::async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render(&self, detail: &FlightDetail) -> anyhow::Result<Image>;
}

pub enum Maps {
    Disabled,
    Http(HttpMapRenderer),
}

impl Maps {
    pub fn http(url: url::Url, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building map renderer HTTP client")?;

        Ok(Self::Http(HttpMapRenderer { url, http_client }))
    }
}

#[async_trait::async_trait]
impl MapRenderer for Maps {
    async fn render(&self, detail: &FlightDetail) -> anyhow::Result<Image> {
        match self {
            Maps::Disabled => anyhow::bail!("map rendering is disabled"),
            Maps::Http(renderer) => renderer.render(detail).await,
        }
    }
}

/// HttpMapRenderer posts the raw flight status to a rendering service,
/// which responds with a PNG.
pub struct HttpMapRenderer {
    url: url::Url,
    http_client: reqwest::Client,
}

impl HttpMapRenderer {
    async fn render(&self, detail: &FlightDetail) -> anyhow::Result<Image> {
        let response = self
            .http_client
            .post(self.url.clone())
            .json(detail)
            .send()
            .await
            .context("calling map renderer")?
            .error_for_status()
            .context("map renderer failed")?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type != "image/png" {
            anyhow::bail!("map renderer returned unexpected content type {content_type:?}");
        }

        let bytes = response
            .bytes()
            .await
            .context("reading rendered map")?
            .to_vec();

        Ok(Image {
            filename: "flight_map.png".to_string(),
            content_type,
            bytes,
        })
    }
}
