// src/output/ansi.rs

use std::env;
use std::sync::Arc;

use crate::output::color::{AnsiColor, ColorNameError, Colorized, parse_color_name, render};
use crate::output::format::OutputFormatter;
use crate::output::sink::{CommandOutput, OutputValue, SystemOutput};

/// Per-channel color configuration. `None` means the channel is uncolored.
#[derive(Debug, Clone, Copy)]
pub struct ColorConfig {
    pub info: Option<AnsiColor>,
    pub output: Option<AnsiColor>,
    pub warning: Option<AnsiColor>,
    pub error: Option<AnsiColor>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            info: Some(AnsiColor::Green),
            output: None,
            warning: Some(AnsiColor::Yellow),
            error: Some(AnsiColor::Red),
        }
    }
}

/// Returns true if the `TERM` environment variable advertises color support.
/// A thin ambient signal for pre-enabling colorized output.
pub fn ansi_env_enabled() -> bool {
    env::var("TERM").is_ok_and(|term| term.contains("color"))
}

/// Colorizing sink and formatter in one: plain channel writes are wrapped in
/// the channel's configured color, and [`Colorized`] values are rendered
/// span-by-span through [`render`].
pub struct AnsiColorOutput {
    sink: SystemOutput,
    base: Option<Arc<dyn OutputFormatter>>,
    config: ColorConfig,
}

impl AnsiColorOutput {
    pub fn builder() -> AnsiColorOutputBuilder {
        AnsiColorOutputBuilder::default()
    }

    pub fn new(config: ColorConfig) -> Self {
        Self {
            sink: SystemOutput,
            base: None,
            config,
        }
    }

    pub fn config(&self) -> &ColorConfig {
        &self.config
    }

    /// Escape-codes `value`: colorized values go through the span renderer,
    /// anything else through the base formatter (or plain conversion).
    pub fn to_colors(&self, value: &OutputValue) -> String {
        match value {
            OutputValue::Colorized(colorized) => render(colorized.text(), colorized.spans()),
            other => match &self.base {
                Some(base) => base.format(other),
                None => other.as_plain(),
            },
        }
    }

    fn wrapped_out(&self, color: Option<AnsiColor>, value: &OutputValue) {
        match (value, color) {
            (OutputValue::Text(text), Some(color)) => {
                self.sink.out_print(color.code());
                self.sink.out_print(text);
                self.sink.out_print(AnsiColor::Reset.code());
                self.sink.out_print("\n");
            }
            _ => self.sink.output(OutputValue::Text(self.to_colors(value))),
        }
    }

    fn wrapped_err(&self, color: Option<AnsiColor>, value: &OutputValue) {
        if let Some(color) = color {
            self.sink.err_print(color.code());
            self.sink.err_print(&self.to_colors(value));
            self.sink.err_print(AnsiColor::Reset.code());
            self.sink.err_print("\n");
        } else {
            self.sink.error(OutputValue::Text(self.to_colors(value)));
        }
    }
}

impl CommandOutput for AnsiColorOutput {
    fn info(&self, value: OutputValue) {
        self.wrapped_out(self.config.info, &value);
    }

    fn output(&self, value: OutputValue) {
        self.wrapped_out(self.config.output, &value);
    }

    fn warning(&self, value: OutputValue) {
        self.wrapped_err(self.config.warning, &value);
    }

    fn error(&self, value: OutputValue) {
        self.wrapped_err(self.config.error, &value);
    }
}

impl OutputFormatter for AnsiColorOutput {
    fn format(&self, value: &OutputValue) -> String {
        self.to_colors(value)
    }

    fn with_base(&self, base: Arc<dyn OutputFormatter>) -> Arc<dyn OutputFormatter> {
        Arc::new(Self {
            sink: SystemOutput,
            base: Some(base),
            config: self.config,
        })
    }
}

/// Accumulates a per-channel color configuration.
#[derive(Debug, Default, Clone)]
pub struct AnsiColorOutputBuilder {
    config: Option<ColorConfig>,
}

impl AnsiColorOutputBuilder {
    fn config_mut(&mut self) -> &mut ColorConfig {
        self.config.get_or_insert_with(ColorConfig::default)
    }

    pub fn info(mut self, color: Option<AnsiColor>) -> Self {
        self.config_mut().info = color;
        self
    }

    pub fn output(mut self, color: Option<AnsiColor>) -> Self {
        self.config_mut().output = color;
        self
    }

    pub fn warning(mut self, color: Option<AnsiColor>) -> Self {
        self.config_mut().warning = color;
        self
    }

    pub fn error(mut self, color: Option<AnsiColor>) -> Self {
        self.config_mut().error = color;
        self
    }

    /// Set a channel color by name (e.g. "red"), as read from configuration.
    pub fn info_name(self, name: &str) -> Result<Self, ColorNameError> {
        let color = parse_color_name(name)?;
        Ok(self.info(Some(color)))
    }

    pub fn output_name(self, name: &str) -> Result<Self, ColorNameError> {
        let color = parse_color_name(name)?;
        Ok(self.output(Some(color)))
    }

    pub fn warning_name(self, name: &str) -> Result<Self, ColorNameError> {
        let color = parse_color_name(name)?;
        Ok(self.warning(Some(color)))
    }

    pub fn error_name(self, name: &str) -> Result<Self, ColorNameError> {
        let color = parse_color_name(name)?;
        Ok(self.error(Some(color)))
    }

    pub fn config(mut self, config: ColorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(&self) -> AnsiColorOutput {
        AnsiColorOutput::new(self.config.unwrap_or_default())
    }
}

/// Convenience: colorize every key and value of a mapping.
pub fn colorize_map(
    entries: Vec<(String, OutputValue)>,
    key: Option<AnsiColor>,
    value: Option<AnsiColor>,
) -> OutputValue {
    let colored = entries
        .into_iter()
        .map(|(k, v)| {
            let k = match key {
                Some(color) => Colorized::whole(color, k).render(),
                None => k,
            };
            let v = match value {
                Some(color) => {
                    OutputValue::Colorized(Colorized::whole(color, v.as_plain()))
                }
                None => v,
            };
            (k, v)
        })
        .collect();
    OutputValue::Map(colored)
}

// MARK: --- UNIT TESTS ---
