// src/output/format.rs

use std::sync::Arc;

use crate::output::channels::{Channel, ChannelOutput};
use crate::output::sink::{CommandOutput, OutputValue};

/// Transforms a result value into displayable text.
///
/// Formatters are immutable decorators: `with_base` returns a new formatter
/// delegating non-matching values to a different fallback, leaving the
/// original untouched.
pub trait OutputFormatter: Send + Sync {
    fn format(&self, value: &OutputValue) -> String;

    fn with_base(&self, base: Arc<dyn OutputFormatter>) -> Arc<dyn OutputFormatter>;
}

/// The terminal base of every chain: a plain to-text conversion.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToStringFormatter;

impl OutputFormatter for ToStringFormatter {
    fn format(&self, value: &OutputValue) -> String {
        value.as_plain()
    }

    fn with_base(&self, base: Arc<dyn OutputFormatter>) -> Arc<dyn OutputFormatter> {
        base
    }
}

/// Prepends a fixed prefix to every line of the formatted text, keeping the
/// input's trailing-separator convention intact.
pub struct PrefixFormatter {
    prefix: String,
    base: Option<Arc<dyn OutputFormatter>>,
}

impl PrefixFormatter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base: None,
        }
    }

    pub fn over(prefix: impl Into<String>, base: Arc<dyn OutputFormatter>) -> Self {
        Self {
            prefix: prefix.into(),
            base: Some(base),
        }
    }

    fn add_prefix(&self, text: &str) -> String {
        if text.is_empty() {
            return self.prefix.clone();
        }
        let mut out = String::with_capacity(text.len() + self.prefix.len() * 4);
        for line in text.split_inclusive('\n') {
            out.push_str(&self.prefix);
            out.push_str(line);
        }
        out
    }
}

impl OutputFormatter for PrefixFormatter {
    fn format(&self, value: &OutputValue) -> String {
        let text = match &self.base {
            Some(base) => base.format(value),
            None => value.as_plain(),
        };
        self.add_prefix(&text)
    }

    fn with_base(&self, base: Arc<dyn OutputFormatter>) -> Arc<dyn OutputFormatter> {
        Arc::new(Self {
            prefix: self.prefix.clone(),
            base: Some(base),
        })
    }
}

/// Projects list values as `- item` lines and map values as `key: value`
/// lines, recursing into nested structure; everything else goes to the base.
pub struct NiceFormatter {
    base: Option<Arc<dyn OutputFormatter>>,
}

impl NiceFormatter {
    pub fn new() -> Self {
        Self { base: None }
    }

    pub fn over(base: Arc<dyn OutputFormatter>) -> Self {
        Self { base: Some(base) }
    }
}

impl Default for NiceFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for NiceFormatter {
    fn format(&self, value: &OutputValue) -> String {
        match value {
            OutputValue::List(items) => {
                let lines: Vec<String> = items
                    .iter()
                    .map(|item| format!("- {}", self.format(item)))
                    .collect();
                lines.join("\n")
            }
            OutputValue::Map(entries) => {
                let lines: Vec<String> = entries
                    .iter()
                    .map(|(key, item)| format!("{key}: {}", self.format(item)))
                    .collect();
                lines.join("\n")
            }
            other => match &self.base {
                Some(base) => base.format(other),
                None => other.as_plain(),
            },
        }
    }

    fn with_base(&self, base: Arc<dyn OutputFormatter>) -> Arc<dyn OutputFormatter> {
        Arc::new(Self { base: Some(base) })
    }
}

/// The assembled end of the pipeline: formats every value with the chain,
/// then routes the text through the channel router.
pub struct FormattedOutput {
    channels: ChannelOutput,
    formatter: Arc<dyn OutputFormatter>,
}

impl FormattedOutput {
    pub fn new(channels: ChannelOutput, formatter: Arc<dyn OutputFormatter>) -> Self {
        Self {
            channels,
            formatter,
        }
    }

    fn deliver(&self, channel: Channel, value: &OutputValue) {
        self.channels
            .route(channel, OutputValue::Text(self.formatter.format(value)));
    }
}

impl CommandOutput for FormattedOutput {
    fn info(&self, value: OutputValue) {
        self.deliver(Channel::Info, &value);
    }

    fn output(&self, value: OutputValue) {
        self.deliver(Channel::Output, &value);
    }

    fn warning(&self, value: OutputValue) {
        self.deliver(Channel::Warning, &value);
    }

    fn error(&self, value: OutputValue) {
        self.deliver(Channel::Error, &value);
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::sink::MemoryOutput;

    #[test]
    fn test_prefix_single_line_without_trailing_newline() {
        let formatter = PrefixFormatter::new("# ");
        assert_eq!(formatter.format(&OutputValue::text("alpha")), "# alpha");
    }

    #[test]
    fn test_prefix_preserves_line_convention() {
        let formatter = PrefixFormatter::new("> ");
        assert_eq!(
            formatter.format(&OutputValue::text("a\nb\n")),
            "> a\n> b\n"
        );
        assert_eq!(formatter.format(&OutputValue::text("a\nb")), "> a\n> b");
    }

    #[test]
    fn test_nice_formatter_projects_lists_and_maps() {
        let formatter = NiceFormatter::new();
        let list = OutputValue::List(vec![OutputValue::text("one"), OutputValue::text("two")]);
        assert_eq!(formatter.format(&list), "- one\n- two");

        let map = OutputValue::Map(vec![
            ("name".to_string(), OutputValue::text("demo")),
            ("count".to_string(), OutputValue::text("3")),
        ]);
        assert_eq!(formatter.format(&map), "name: demo\ncount: 3");
    }

    #[test]
    fn test_nice_formatter_recurses_into_nested_structure() {
        let formatter = NiceFormatter::new();
        let nested = OutputValue::Map(vec![(
            "items".to_string(),
            OutputValue::List(vec![OutputValue::text("x")]),
        )]);
        assert_eq!(formatter.format(&nested), "items: - x");
    }

    #[test]
    fn test_with_base_builds_a_new_chain() {
        let prefix: Arc<dyn OutputFormatter> = Arc::new(PrefixFormatter::new("* "));
        let chained = NiceFormatter::new().with_base(prefix);
        // Non-structured values fall through to the prefix base.
        assert_eq!(chained.format(&OutputValue::text("plain")), "* plain");
        // The standalone formatter is unaffected.
        assert_eq!(
            NiceFormatter::new().format(&OutputValue::text("plain")),
            "plain"
        );
    }

    #[test]
    fn test_formatted_output_formats_then_routes() {
        let sink = Arc::new(MemoryOutput::new());
        let channels = ChannelOutput::builder().fallback(sink.clone()).build();
        let formatted = FormattedOutput::new(channels, Arc::new(NiceFormatter::new()));
        formatted.output(OutputValue::List(vec![
            OutputValue::text("a"),
            OutputValue::text("b"),
        ]));
        assert_eq!(sink.channel(Channel::Output), vec!["- a\n- b"]);
    }
}
