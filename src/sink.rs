//! User-facing diagnostics that are not part of an operation's return value.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

pub trait Sink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards messages to the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn info(&self, message: &str) {
        info!(target: "cogent_lg::sink", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "cogent_lg::sink", "{}", message);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Info(String),
    Error(String),
}

/// Keeps every message in memory, useful for callers that render diagnostics themselves.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn infos(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Info(s) => Some(s),
                Message::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Error(s) => Some(s),
                Message::Info(_) => None,
            })
            .collect()
    }

    fn push(&self, message: Message) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

impl Sink for MemorySink {
    fn info(&self, message: &str) {
        self.push(Message::Info(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.push(Message::Error(message.to_owned()));
    }
}
