// src/output/channels.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::output::sink::{CommandOutput, OutputValue, SystemOutput};

/// One of the four named output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Info,
    Output,
    Warning,
    Error,
}

/// Routes each channel to its bound sink, or to the fallback when unbound.
/// Pure delivery: values arrive at the sink in call order, nothing is
/// buffered or reordered.
pub struct ChannelOutput {
    sinks: HashMap<Channel, Arc<dyn CommandOutput>>,
    fallback: Arc<dyn CommandOutput>,
}

impl ChannelOutput {
    pub fn builder() -> ChannelOutputBuilder {
        ChannelOutputBuilder::default()
    }

    fn sink_for(&self, channel: Channel) -> &Arc<dyn CommandOutput> {
        self.sinks.get(&channel).unwrap_or(&self.fallback)
    }

    /// Delivers `value` to the sink bound for `channel`.
    pub fn route(&self, channel: Channel, value: OutputValue) {
        let sink = self.sink_for(channel);
        match channel {
            Channel::Info => sink.info(value),
            Channel::Output => sink.output(value),
            Channel::Warning => sink.warning(value),
            Channel::Error => sink.error(value),
        }
    }
}

impl CommandOutput for ChannelOutput {
    fn info(&self, value: OutputValue) {
        self.route(Channel::Info, value);
    }

    fn output(&self, value: OutputValue) {
        self.route(Channel::Output, value);
    }

    fn warning(&self, value: OutputValue) {
        self.route(Channel::Warning, value);
    }

    fn error(&self, value: OutputValue) {
        self.route(Channel::Error, value);
    }
}

/// Accumulates per-channel bindings and a fallback, producing an immutable
/// router. Unbound channels use the fallback (`SystemOutput` if never set).
#[derive(Default)]
pub struct ChannelOutputBuilder {
    sinks: HashMap<Channel, Arc<dyn CommandOutput>>,
    fallback: Option<Arc<dyn CommandOutput>>,
}

impl ChannelOutputBuilder {
    pub fn bind(mut self, channel: Channel, sink: Arc<dyn CommandOutput>) -> Self {
        self.sinks.insert(channel, sink);
        self
    }

    pub fn fallback(mut self, sink: Arc<dyn CommandOutput>) -> Self {
        self.fallback = Some(sink);
        self
    }

    pub fn build(self) -> ChannelOutput {
        ChannelOutput {
            sinks: self.sinks,
            fallback: self.fallback.unwrap_or_else(|| Arc::new(SystemOutput)),
        }
    }
}

// MARK: --- UNIT TESTS ---
