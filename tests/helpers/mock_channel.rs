#![allow(dead_code)]
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lognotify::{DeliveryChannel, NotifyFormat, NotifyType};

/// Outcome of the next `submit` call on a [`MockChannel`].
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// Report success.
    Accept,
    /// Report a transported-but-rejected submission (`Ok(false)`).
    Reject,
    /// Fail with a transport error.
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub title: String,
    pub body: String,
}

/// A delivery channel that records every submission and plays back a queue
/// of scripted outcomes (defaulting to success once the queue is empty).
#[derive(Clone)]
pub struct MockChannel {
    submissions: Arc<Mutex<Vec<Submission>>>,
    outcomes: Arc<Mutex<VecDeque<Outcome>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(Mutex::new(Vec::new())),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push_outcome(&self, outcome: Outcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Option<String> {
        self.submissions
            .lock()
            .unwrap()
            .last()
            .map(|s| s.body.clone())
    }
}

impl DeliveryChannel for MockChannel {
    fn name(&self) -> &str {
        "mock"
    }

    fn submit(
        &self,
        title: &str,
        body: &str,
        _notify_type: NotifyType,
        _format: NotifyFormat,
    ) -> anyhow::Result<bool> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);

        // Failed transports never record a submission; rejected ones do,
        // mirroring a server that received but refused the message.
        match outcome {
            Outcome::Fail => anyhow::bail!("mock transport failure"),
            Outcome::Reject => {
                self.submissions.lock().unwrap().push(Submission {
                    title: title.to_string(),
                    body: body.to_string(),
                });
                Ok(false)
            }
            Outcome::Accept => {
                self.submissions.lock().unwrap().push(Submission {
                    title: title.to_string(),
                    body: body.to_string(),
                });
                Ok(true)
            }
        }
    }
}
