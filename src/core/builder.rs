// src/core/builder.rs

use std::sync::Arc;

use crate::constants::DEFAULT_HELP_TOKENS;
use crate::core::dispatch::{BannerSupplier, ErrorHandler, Tool};
use crate::core::input::{InputParser, NullInput};
use crate::core::registry::{CommandTree, RegistryError};
use crate::models::{CommandDescriptor, ErrorKind};
use crate::output::ansi::{AnsiColorOutputBuilder, ColorConfig};
use crate::output::channels::{Channel, ChannelOutputBuilder};
use crate::output::format::{FormattedOutput, NiceFormatter, OutputFormatter, ToStringFormatter};
use crate::output::sink::{CommandOutput, OutputValue, SystemOutput};

/// Assembles a [`Tool`]: commands, input parser, output pipeline, error
/// handlers, and presentation settings.
///
/// The output pipeline built here is, outermost first: a formatter chain
/// (the caller's formatter over a list/map-aware one over the color-or-plain
/// base) feeding a channel router whose fallback is the base sink.
pub struct ToolBuilder {
    tree: CommandTree,
    help_tokens: Vec<String>,
    handlers: Vec<(ErrorKind, ErrorHandler)>,
    parser: Option<Arc<dyn InputParser>>,
    output: Option<Arc<dyn CommandOutput>>,
    final_output: Option<Arc<dyn CommandOutput>>,
    channels: ChannelOutputBuilder,
    formatter: Option<Arc<dyn OutputFormatter>>,
    ansi_color: bool,
    ansi: AnsiColorOutputBuilder,
    banner: Option<BannerSupplier>,
    show_banner: bool,
    print_stack_trace: bool,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            tree: CommandTree::new(name),
            help_tokens: DEFAULT_HELP_TOKENS.clone(),
            handlers: Vec::new(),
            parser: None,
            output: None,
            final_output: None,
            channels: ChannelOutputBuilder::default(),
            formatter: None,
            ansi_color: false,
            ansi: AnsiColorOutputBuilder::default(),
            banner: None,
            show_banner: true,
            print_stack_trace: true,
        }
    }

    /// Registers a descriptor at the root of the command tree.
    pub fn command(mut self, descriptor: CommandDescriptor) -> Result<Self, RegistryError> {
        self.tree.register(descriptor)?;
        Ok(self)
    }

    /// Registers a descriptor at an explicit path, creating intermediate
    /// groups as needed. `descriptions` applies per path segment.
    pub fn command_at(
        mut self,
        path: &[&str],
        descriptions: &[&str],
        descriptor: CommandDescriptor,
    ) -> Result<Self, RegistryError> {
        self.tree.register_at(path, descriptions, descriptor)?;
        Ok(self)
    }

    /// Replaces the token set recognized as a help request.
    pub fn help_tokens(mut self, tokens: Vec<String>) -> Self {
        self.help_tokens = tokens;
        self
    }

    /// Registers an error handler for a kind. Handlers of the same kind run
    /// in registration order until one claims the error.
    pub fn handles(mut self, kind: ErrorKind, handler: ErrorHandler) -> Self {
        self.handlers.push((kind, handler));
        self
    }

    pub fn input(mut self, parser: Arc<dyn InputParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets the base sink the pipeline is built around.
    pub fn output(mut self, sink: Arc<dyn CommandOutput>) -> Self {
        self.output = Some(sink);
        self
    }

    /// Sets the finished sink verbatim, bypassing pipeline assembly.
    pub fn final_output(mut self, sink: Arc<dyn CommandOutput>) -> Self {
        self.final_output = Some(sink);
        self
    }

    /// Routes one channel to a dedicated sink; unrouted channels fall back
    /// to the base sink.
    pub fn channel(mut self, channel: Channel, sink: Arc<dyn CommandOutput>) -> Self {
        self.channels = self.channels.bind(channel, sink);
        self
    }

    /// Adds a formatter on top of the assembled chain.
    pub fn formatter(mut self, formatter: Arc<dyn OutputFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Enables or disables ANSI color rendering in the default pipeline.
    pub fn ansi_color(mut self, enabled: bool) -> Self {
        self.ansi_color = enabled;
        self
    }

    /// Sets the per-channel color scheme used when color is enabled.
    pub fn ansi_config(mut self, config: ColorConfig) -> Self {
        self.ansi = self.ansi.config(config);
        self
    }

    /// Sets a fixed banner printed above root-level help.
    pub fn banner(self, banner: impl Into<String>) -> Self {
        let text = banner.into();
        self.banner_with(Arc::new(move || Some(text.clone())))
    }

    /// Sets a banner supplier consulted each time root help prints.
    pub fn banner_with(mut self, supplier: BannerSupplier) -> Self {
        self.banner = Some(supplier);
        self
    }

    pub fn show_banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// Controls whether an unclaimed fatal failure also prints its debug
    /// representation, source chain included.
    pub fn print_stack_trace(mut self, print: bool) -> Self {
        self.print_stack_trace = print;
        self
    }

    pub fn build(mut self) -> Result<Tool, RegistryError> {
        self.tree.finalize()?;
        log::debug!(
            "Building tool '{}' with {} root command(s)",
            self.tree.root().name(),
            self.tree.root().list_visible().len()
        );

        let has_input_handler = self
            .handlers
            .iter()
            .any(|(kind, _)| *kind == ErrorKind::Input);
        if !has_input_handler {
            let token = self
                .help_tokens
                .first()
                .cloned()
                .unwrap_or_else(|| "-h".to_string());
            self.handlers.push((
                ErrorKind::Input,
                Box::new(move |error, ctx| {
                    let path = ctx.path_string();
                    ctx.output().warning(OutputValue::Text(format!(
                        "Input error for [{path}]: {error}"
                    )));
                    ctx.output().warning(OutputValue::Text(format!(
                        "You can use: \"{path} {token}\" to get help."
                    )));
                    true
                }),
            ));
        }

        let base_output: Arc<dyn CommandOutput> = match self.output {
            Some(sink) => sink,
            None if self.ansi_color => Arc::new(self.ansi.build()),
            None => Arc::new(SystemOutput),
        };

        let output: Arc<dyn CommandOutput> = match self.final_output {
            Some(sink) => sink,
            None => {
                let base_formatter: Arc<dyn OutputFormatter> = if self.ansi_color {
                    Arc::new(self.ansi.build())
                } else {
                    Arc::new(ToStringFormatter)
                };
                let chain: Arc<dyn OutputFormatter> =
                    Arc::new(NiceFormatter::over(base_formatter));
                let chain = match self.formatter {
                    Some(top) => top.with_base(chain),
                    None => chain,
                };
                let channels = self.channels.fallback(Arc::clone(&base_output)).build();
                Arc::new(FormattedOutput::new(channels, chain))
            }
        };

        Ok(Tool {
            tree: self.tree,
            help_tokens: self.help_tokens,
            handlers: self.handlers,
            parser: self.parser.unwrap_or_else(|| Arc::new(NullInput)),
            output,
            print_stack_trace: self.print_stack_trace,
            show_banner: self.show_banner,
            banner: self.banner,
            other: None,
        })
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operation;
    use crate::output::sink::MemoryOutput;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    fn leaf(name: &str) -> Operation {
        Operation::new(name, |_| Ok(true))
    }

    #[test]
    fn test_command_at_dispatches_through_the_path() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command_at(
                &["system", "jobs"],
                &["System administration", "Job control"],
                CommandDescriptor::new("queue").operation(leaf("list")),
            )
            .unwrap()
            .build()
            .unwrap();

        // The path segments alone address the registered operations; the
        // descriptor's own name is not a namespace level.
        assert!(tool.run(&args(&["system", "jobs", "list"])).unwrap());
        assert!(tool.run(&args(&["system", "jobs", "queue", "list"])).is_err());
    }

    #[test]
    fn test_custom_help_tokens_replace_defaults() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .help_tokens(vec!["assist".to_string()])
            .command(CommandDescriptor::new("sub").operation(leaf("go")))
            .unwrap()
            .build()
            .unwrap();

        assert!(tool.run(&args(&["assist"])).unwrap());
        // The default tokens are gone, so "help" is an unknown command.
        assert!(tool.run(&args(&["help"])).is_err());
    }

    #[test]
    fn test_channel_routing_overrides_fallback() {
        let base = Arc::new(MemoryOutput::new());
        let warnings = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&base) as Arc<dyn CommandOutput>)
            .channel(
                Channel::Warning,
                Arc::clone(&warnings) as Arc<dyn CommandOutput>,
            )
            .command(CommandDescriptor::new("sub").operation(leaf("go")))
            .unwrap()
            .build()
            .unwrap();

        assert!(!tool.run_main(&args(&["nope"]), false));
        assert!(base.channel(Channel::Warning).is_empty());
        assert_eq!(warnings.channel(Channel::Warning).len(), 1);
    }

    #[test]
    fn test_final_output_bypasses_pipeline() {
        let sink = Arc::new(MemoryOutput::new());
        let routed = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .final_output(Arc::clone(&routed) as Arc<dyn CommandOutput>)
            .command(CommandDescriptor::new("sub").operation(leaf("go")))
            .unwrap()
            .build()
            .unwrap();

        assert!(!tool.run_main(&args(&["nope"]), false));
        assert!(sink.channel(Channel::Warning).is_empty());
        assert_eq!(routed.channel(Channel::Warning).len(), 1);
    }

    #[test]
    fn test_banner_prints_above_root_help_only() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .banner("== DEMO ==")
            .command(
                CommandDescriptor::new("sub")
                    .operation(leaf("go"))
                    .operation(leaf("stop")),
            )
            .unwrap()
            .build()
            .unwrap();

        assert!(tool.run(&args(&["help"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(lines.iter().any(|line| line.contains("== DEMO ==")));

        sink.clear();
        assert!(tool.run(&args(&["sub", "help"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(!lines.iter().any(|line| line.contains("== DEMO ==")));
    }

    #[test]
    fn test_show_banner_false_suppresses_banner() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .banner("== DEMO ==")
            .show_banner(false)
            .command(CommandDescriptor::new("sub").operation(leaf("go")))
            .unwrap()
            .build()
            .unwrap();

        assert!(tool.run(&args(&["help"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(!lines.iter().any(|line| line.contains("== DEMO ==")));
    }
}
