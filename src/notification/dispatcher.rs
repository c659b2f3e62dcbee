//! Fans one submission out to every configured destination.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::channel::{DeliveryChannel, DeliveryError, NotifyFormat, NotifyType};
use super::webhook::{SlackChannel, WebhookChannel};

/// Ordered set of delivery channels plus destination discovery.
pub struct Dispatcher {
    channels: Vec<Box<dyn DeliveryChannel>>,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            channels: Vec::new(),
            request_timeout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn add_channel(&mut self, channel: Box<dyn DeliveryChannel>) {
        self.channels.push(channel);
    }

    /// Adds a destination by URL. Scheme decides the channel type:
    /// `slack://A/B/C` and `hooks.slack.com` URLs become Slack channels,
    /// any other http(s) URL a generic JSON webhook.
    pub fn add_url(&mut self, url: &str) -> Result<(), DeliveryError> {
        let url = url.trim();
        if let Some(tokens) = url.strip_prefix("slack://") {
            self.channels
                .push(Box::new(SlackChannel::from_tokens(tokens, self.request_timeout)?));
        } else if url.starts_with("http://") || url.starts_with("https://") {
            if url.contains("hooks.slack.com") {
                self.channels
                    .push(Box::new(SlackChannel::new(url.to_string(), self.request_timeout)?));
            } else {
                self.channels
                    .push(Box::new(WebhookChannel::new(url.to_string(), self.request_timeout)?));
            }
        } else {
            return Err(DeliveryError::UnsupportedScheme(url.to_string()));
        }
        Ok(())
    }

    /// Loads destination URLs from a config file: one URL per line, `#`
    /// comments, and `include <path>` directives followed up to
    /// `recursion_depth` levels deep. Returns the number of destinations
    /// added.
    pub fn load_config_file(
        &mut self,
        path: &Path,
        recursion_depth: usize,
    ) -> Result<usize, DeliveryError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DeliveryError::ConfigRead(path.to_path_buf(), e))?;

        let mut added = 0;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(include) = line.strip_prefix("include ") {
                if recursion_depth == 0 {
                    warn!(path = %path.display(), "include depth exhausted, skipping '{include}'");
                    continue;
                }
                let target = resolve_include(path, include.trim());
                added += self.load_config_file(&target, recursion_depth - 1)?;
                continue;
            }
            match self.add_url(line) {
                Ok(()) => added += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "skipping destination"),
            }
        }
        Ok(added)
    }

    /// Probes the fixed ordered list of default config paths and loads each
    /// one that exists. Missing files are not an error.
    pub fn load_default_config_paths(&mut self, recursion_depth: usize) {
        for path in default_config_paths() {
            if !path.is_file() {
                continue;
            }
            match self.load_config_file(&path, recursion_depth) {
                Ok(added) => {
                    debug!(path = %path.display(), added, "loaded destination config")
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to load config"),
            }
        }
    }

    /// Submits to every channel. Returns `Ok(true)` only when every channel
    /// accepted; partial failure counts as overall failure. Every channel is
    /// attempted even after a transport error, and the first error propagates
    /// once the fan-out completes.
    pub fn submit(
        &self,
        title: &str,
        body: &str,
        notify_type: NotifyType,
        format: NotifyFormat,
    ) -> anyhow::Result<bool> {
        if self.channels.is_empty() {
            debug!("no destinations configured");
            return Ok(false);
        }

        let mut all_accepted = true;
        let mut first_error = None;
        for channel in &self.channels {
            match channel.submit(title, body, notify_type, format) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(channel = channel.name(), "destination rejected submission");
                    all_accepted = false;
                }
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "destination submission failed");
                    all_accepted = false;
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(all_accepted),
        }
    }
}

fn resolve_include(from: &Path, include: &str) -> PathBuf {
    let include = Path::new(include);
    if include.is_absolute() {
        include.to_path_buf()
    } else {
        from.parent().unwrap_or(Path::new(".")).join(include)
    }
}

/// Fixed ordered list of default destination-config locations.
pub fn default_config_paths() -> Vec<PathBuf> {
    let Some(home) = std::env::var_os("HOME") else {
        return Vec::new();
    };
    let home = PathBuf::from(home);
    vec![
        home.join(".lognotify"),
        home.join(".config").join("lognotify").join("urls"),
    ]
}
