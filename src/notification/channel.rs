//! The delivery-channel contract and the message hint enums.

use serde::Serialize;
use thiserror::Error;

/// Semantic category hint attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyType {
    Info,
    Success,
    Warning,
    Failure,
}

/// Body format hint attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyFormat {
    Text,
    Markdown,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("unsupported destination scheme in '{0}'")]
    UnsupportedScheme(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to read destination config '{0}': {1}")]
    ConfigRead(std::path::PathBuf, std::io::Error),
}

/// A single notification destination.
///
/// `submit` distinguishes a transported-but-rejected submission (`Ok(false)`)
/// from a transport failure (`Err`); the caller treats both as
/// delivery failure and keeps the buffer.
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &str;

    fn submit(
        &self,
        title: &str,
        body: &str,
        notify_type: NotifyType,
        format: NotifyFormat,
    ) -> anyhow::Result<bool>;
}
