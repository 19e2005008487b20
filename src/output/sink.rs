// src/output/sink.rs

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::output::channels::Channel;
use crate::output::color::Colorized;

/// A value travelling through the output pipeline.
///
/// `List` and `Map` are the "projectable" shapes: structured formatters may
/// present them as an ordered list or a key/value mapping instead of plain
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    Text(String),
    Colorized(Colorized),
    List(Vec<OutputValue>),
    Map(Vec<(String, OutputValue)>),
}

impl OutputValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn colorized(value: Colorized) -> Self {
        Self::Colorized(value)
    }

    /// The plain-text rendition: spans stripped, structure flattened with
    /// conventional `Debug`-like brackets.
    pub fn as_plain(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Colorized(value) => value.text().to_string(),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(Self::as_plain).collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{key}: {}", value.as_plain()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for OutputValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Colorized> for OutputValue {
    fn from(value: Colorized) -> Self {
        Self::Colorized(value)
    }
}

/// The output contract of a running command: four named channels, each
/// accepting an arbitrary value.
pub trait CommandOutput: Send + Sync {
    /// Informational output; may be suppressed by data-oriented sinks.
    fn info(&self, value: OutputValue);
    fn output(&self, value: OutputValue);
    fn warning(&self, value: OutputValue);
    fn error(&self, value: OutputValue);
}

/// Writes info/output to stdout and warning/error to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOutput;

impl SystemOutput {
    /// Raw write to stdout without a newline, for escape codes.
    pub fn out_print(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    /// Raw write to stderr without a newline, for escape codes.
    pub fn err_print(&self, text: &str) {
        eprint!("{text}");
        let _ = std::io::stderr().flush();
    }
}

impl CommandOutput for SystemOutput {
    fn info(&self, value: OutputValue) {
        println!("{}", value.as_plain());
    }

    fn output(&self, value: OutputValue) {
        println!("{}", value.as_plain());
    }

    fn warning(&self, value: OutputValue) {
        eprintln!("{}", value.as_plain());
    }

    fn error(&self, value: OutputValue) {
        eprintln!("{}", value.as_plain());
    }
}

/// Captures everything written to it, tagged by channel. Useful for testing
/// tools built on this crate; this crate's own tests use it heavily.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    entries: Mutex<Vec<(Channel, String)>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, channel: Channel, value: &OutputValue) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel, value.as_plain()));
    }

    /// Every captured entry, in write order.
    pub fn entries(&self) -> Vec<(Channel, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The captured lines for one channel, in write order.
    pub fn channel(&self, channel: Channel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(ch, _)| *ch == channel)
            .map(|(_, line)| line)
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl CommandOutput for MemoryOutput {
    fn info(&self, value: OutputValue) {
        self.record(Channel::Info, &value);
    }

    fn output(&self, value: OutputValue) {
        self.record(Channel::Output, &value);
    }

    fn warning(&self, value: OutputValue) {
        self.record(Channel::Warning, &value);
    }

    fn error(&self, value: OutputValue) {
        self.record(Channel::Error, &value);
    }
}
