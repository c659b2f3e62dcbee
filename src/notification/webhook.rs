//! Webhook-backed delivery channels.
//!
//! Two thin transports: a Slack incoming-webhook channel and a generic JSON
//! webhook. Both use a blocking HTTP client with a request timeout so they
//! remain callable from the flush thread, the panic hook, and drop cleanup.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, error};

use super::channel::{DeliveryChannel, DeliveryError, NotifyFormat, NotifyType};

fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, DeliveryError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?)
}

fn post_json(
    client: &reqwest::blocking::Client,
    name: &str,
    url: &str,
    payload: &Value,
) -> anyhow::Result<bool> {
    let response = client.post(url).json(payload).send();
    match response {
        Ok(res) if res.status().is_success() => {
            debug!(channel = name, "submission accepted");
            Ok(true)
        }
        Ok(res) => {
            let status = res.status();
            let text = res.text().unwrap_or_default();
            error!(channel = name, status = %status, body = %text, "submission rejected");
            Ok(false)
        }
        Err(e) => {
            error!(channel = name, error = %e, "HTTP request failed");
            Err(e.into())
        }
    }
}

/// Posts the batched body to a Slack incoming webhook.
pub struct SlackChannel {
    webhook_url: String,
    client: reqwest::blocking::Client,
}

impl SlackChannel {
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self, DeliveryError> {
        Ok(Self {
            webhook_url,
            client: build_client(timeout)?,
        })
    }

    /// Expands an `slack://TOKEN_A/TOKEN_B/TOKEN_C` destination into the
    /// full incoming-webhook URL.
    pub fn from_tokens(tokens: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let url = format!("https://hooks.slack.com/services/{tokens}");
        Self::new(url, timeout)
    }
}

impl DeliveryChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn submit(
        &self,
        title: &str,
        body: &str,
        _notify_type: NotifyType,
        _format: NotifyFormat,
    ) -> anyhow::Result<bool> {
        let payload = json!({ "text": format!("*{}*\n```\n{}\n```", title, body) });
        post_json(&self.client, self.name(), &self.webhook_url, &payload)
    }
}

/// Posts `{title, body, type, format}` as JSON to an arbitrary endpoint.
pub struct WebhookChannel {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookChannel {
    pub fn new(url: String, timeout: Duration) -> Result<Self, DeliveryError> {
        Ok(Self {
            url,
            client: build_client(timeout)?,
        })
    }
}

impl DeliveryChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn submit(
        &self,
        title: &str,
        body: &str,
        notify_type: NotifyType,
        format: NotifyFormat,
    ) -> anyhow::Result<bool> {
        let payload = json!({
            "title": title,
            "body": body,
            "type": notify_type,
            "format": format,
        });
        post_json(&self.client, self.name(), &self.url, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn webhook_submit_success_reports_true() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/notify")
            .match_header("content-type", "application/json")
            .with_status(200)
            .create();

        let channel = WebhookChannel::new(format!("{}/notify", server.url()), TIMEOUT).unwrap();
        let ok = channel
            .submit("t", "b", NotifyType::Warning, NotifyFormat::Text)
            .unwrap();

        assert!(ok);
        mock.assert();
    }

    #[test]
    fn webhook_server_error_reports_false() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/notify").with_status(500).create();

        let channel = WebhookChannel::new(format!("{}/notify", server.url()), TIMEOUT).unwrap();
        let ok = channel
            .submit("t", "b", NotifyType::Warning, NotifyFormat::Text)
            .unwrap();

        assert!(!ok);
    }

    #[test]
    fn webhook_connection_failure_is_an_error() {
        // Nothing listens on this port.
        let channel =
            WebhookChannel::new("http://127.0.0.1:1/notify".to_string(), TIMEOUT).unwrap();
        let result = channel.submit("t", "b", NotifyType::Warning, NotifyFormat::Text);
        assert!(result.is_err());
    }

    #[test]
    fn slack_channel_wraps_body_in_a_code_block() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/services/A/B/C")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"text": "*Alerts*\n```\nline one\n```"}"#.to_string(),
            ))
            .with_status(200)
            .create();

        let channel =
            SlackChannel::new(format!("{}/services/A/B/C", server.url()), TIMEOUT).unwrap();
        let ok = channel
            .submit("Alerts", "line one", NotifyType::Warning, NotifyFormat::Text)
            .unwrap();

        assert!(ok);
        mock.assert();
    }
}
