use anyhow::Context;
use models::flightaware::{FlightDataWrapper, FlightDetail};
use regex::Regex;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("flight number {0:?} is not a valid path")]
    FlightNumber(String, #[source] url::ParseError),
    #[error("failed to fetch flight page")]
    Fetch(#[from] reqwest::Error),
    #[error("flight page returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode flight data")]
    Decode(#[from] serde_json::Error),
}

/// DataSource fetches the current raw status of a flight.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the status of `flight_number`. Ok(None) means the source has no
    /// flight of that number right now.
    async fn fetch(&self, flight_number: &str) -> Result<Option<FlightDetail>, Error>;
}

/// FlightAware scrapes the bootstrap document embedded in live flight pages.
pub struct FlightAware {
    base_url: url::Url,
    http_client: reqwest::Client,
}

// Live flight pages are not served to clients which don't look like a browser.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

lazy_static::lazy_static! {
    static ref BOOTSTRAP_RE: Regex = Regex::new(r"trackpollBootstrap = (\{.*?\});").unwrap();
}

impl FlightAware {
    pub fn new(base_url: url::Url, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building flight source HTTP client")?;

        Ok(Self {
            base_url,
            http_client,
        })
    }
}

#[async_trait::async_trait]
impl DataSource for FlightAware {
    #[tracing::instrument(level = "debug", err, skip(self))]
    async fn fetch(&self, flight_number: &str) -> Result<Option<FlightDetail>, Error> {
        let url = self
            .base_url
            .join(flight_number)
            .map_err(|err| Error::FlightNumber(flight_number.to_string(), err))?;

        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status()));
        }
        let body = response.text().await?;

        parse_bootstrap(&body)
    }
}

/// Extract the flight of interest from a live flight page.
/// A page without a bootstrap document, or without flights, yields None.
pub fn parse_bootstrap(body: &str) -> Result<Option<FlightDetail>, Error> {
    let Some(captures) = BOOTSTRAP_RE.captures(body) else {
        return Ok(None);
    };
    let wrapper: FlightDataWrapper = serde_json::from_str(&captures[1])?;

    Ok(wrapper.into_first_flight())
}
