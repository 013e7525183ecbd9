use crate::maps::Image;
use notifications::Message;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Notifier delivers rendered alerts to a channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel: &str, message: &Message) -> anyhow::Result<()>;

    async fn upload_file(&self, channel: &str, image: &Image, message: &Message)
        -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("slack request failed")]
    Request(#[from] reqwest::Error),
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
}

#[derive(Debug)]
pub enum Sender {
    Disabled,
    Slack(SlackClient),
}

impl Sender {
    pub fn slack(base_url: url::Url, token: String, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::from)?;

        Ok(Sender::Slack(SlackClient {
            base_url,
            token,
            http_client,
        }))
    }
}

#[async_trait::async_trait]
impl Notifier for Sender {
    async fn post_message(&self, channel: &str, message: &Message) -> anyhow::Result<()> {
        match self {
            Sender::Disabled => {
                tracing::warn!(%channel, text = %message.text, "skipping slack message (disabled)");
                Ok(())
            }
            Sender::Slack(client) => Ok(client.post_message(channel, message).await?),
        }
    }

    async fn upload_file(
        &self,
        channel: &str,
        image: &Image,
        message: &Message,
    ) -> anyhow::Result<()> {
        match self {
            Sender::Disabled => {
                tracing::warn!(%channel, filename = %image.filename, text = %message.text, "skipping slack upload (disabled)");
                Ok(())
            }
            Sender::Slack(client) => Ok(client.upload_file(channel, image, message).await?),
        }
    }
}

/// SlackClient calls the Slack Web API with a bot token.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct SlackClient {
    base_url: url::Url,
    #[derivative(Debug = "ignore")]
    token: String,
    #[derivative(Debug = "ignore")]
    http_client: reqwest::Client,
}

// Every Web API response carries `ok`, and `error` when it's false.
#[derive(serde::Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: String,
    #[serde(flatten)]
    body: T,
}

#[derive(Default, serde::Deserialize)]
struct Empty {}

#[derive(Default, serde::Deserialize)]
struct UploadUrl {
    #[serde(default)]
    upload_url: String,
    #[serde(default)]
    file_id: String,
}

impl SlackClient {
    fn method(&self, method: &'static str) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.base_url.join(method).map_err(|err| Error::Api {
            method,
            error: err.to_string(),
        })?;
        Ok(self.http_client.post(url).bearer_auth(&self.token))
    }

    async fn call<T: DeserializeOwned>(
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let Envelope { ok, error, body } = request
            .send()
            .await?
            .error_for_status()?
            .json::<Envelope<T>>()
            .await?;

        if !ok {
            return Err(Error::Api { method, error });
        }
        Ok(body)
    }

    pub async fn post_message(&self, channel: &str, message: &Message) -> Result<(), Error> {
        let request = self.method("chat.postMessage")?.json(&serde_json::json!({
            "channel": channel,
            "text": message.text,
            "blocks": message.blocks,
        }));
        let Empty {} = Self::call("chat.postMessage", request).await?;

        tracing::debug!(%channel, "posted slack message");
        Ok(())
    }

    /// Upload `image` to `channel` through the external upload flow, sharing it
    /// with `message` as its layout.
    pub async fn upload_file(
        &self,
        channel: &str,
        image: &Image,
        message: &Message,
    ) -> Result<(), Error> {
        let length = image.bytes.len().to_string();
        let request = self
            .method("files.getUploadURLExternal")?
            .form(&[("filename", image.filename.as_str()), ("length", length.as_str())]);
        let UploadUrl {
            upload_url,
            file_id,
        } = Self::call("files.getUploadURLExternal", request).await?;

        self.http_client
            .post(upload_url.as_str())
            .header(reqwest::header::CONTENT_TYPE, &image.content_type)
            .body(image.bytes.clone())
            .send()
            .await?
            .error_for_status()?;

        let request = self
            .method("files.completeUploadExternal")?
            .json(&serde_json::json!({
                "files": [{"id": file_id, "title": message.title}],
                "channel_id": channel,
                "blocks": message.blocks,
            }));
        let Empty {} = Self::call("files.completeUploadExternal", request).await?;

        tracing::debug!(%channel, %file_id, "uploaded slack file");
        Ok(())
    }
}
