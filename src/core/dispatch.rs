// src/core/dispatch.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::constants::EXIT_FAILURE;
use crate::core::builder::ToolBuilder;
use crate::core::help;
use crate::core::input::InputParser;
use crate::core::registry::{CommandNode, CommandTree, Group, RegistryError};
use crate::models::{
    ActionArgs, ActionError, CommandDescriptor, ErrorKind, Operation, ParamBinding,
};
use crate::output::ansi::ansi_env_enabled;
use crate::output::sink::{CommandOutput, OutputValue};

/// The outcome of a dispatch that did not complete normally.
///
/// `Warning` is a user mistake (unknown command, bad invocation) and is
/// reported on the warning channel. `Failure` is a fatal run failure raised
/// by an action and left unclaimed by every handler.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{0}")]
    Warning(String),
    #[error("{message}")]
    Failure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// A registered error handler. Returning `true` claims the error: it is
/// considered dealt with and is not reported or propagated further.
pub type ErrorHandler = Box<dyn Fn(&ActionError, &InvocationContext<'_>) -> bool + Send + Sync>;

/// Produces the banner printed above root-level help, or `None` to skip it.
pub type BannerSupplier = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Per-run dispatch state: the resolved command path so far plus borrowed
/// access to the tool's parser, sink, and handler chain. The tree itself is
/// never mutated during a run.
pub struct InvocationContext<'t> {
    pub(crate) parser: &'t dyn InputParser,
    pub(crate) output: Arc<dyn CommandOutput>,
    pub(crate) handlers: &'t [(ErrorKind, ErrorHandler)],
    pub(crate) path: Vec<String>,
    pub(crate) help_tokens: &'t [String],
    pub(crate) print_stack_trace: bool,
}

impl<'t> InvocationContext<'t> {
    pub fn output(&self) -> &Arc<dyn CommandOutput> {
        &self.output
    }

    pub fn parser(&self) -> &dyn InputParser {
        self.parser
    }

    /// The command path resolved so far, starting at the tool name.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn path_string(&self) -> String {
        self.path.join(" ")
    }

    pub fn help_tokens(&self) -> &[String] {
        self.help_tokens
    }

    /// Whether error handlers should report full error chains.
    pub fn print_stack_trace(&self) -> bool {
        self.print_stack_trace
    }

    fn is_help_token(&self, token: &str) -> bool {
        self.help_tokens.iter().any(|t| t == token)
    }

    fn push(&mut self, segment: &str) {
        self.path.push(segment.to_string());
    }

    /// A copy of this context one level deeper, for help traversal.
    pub(crate) fn descend(&self, segment: &str) -> InvocationContext<'t> {
        let mut path = self.path.clone();
        path.push(segment.to_string());
        InvocationContext {
            parser: self.parser,
            output: Arc::clone(&self.output),
            handlers: self.handlers,
            path,
            help_tokens: self.help_tokens,
            print_stack_trace: self.print_stack_trace,
        }
    }

    /// Offers the error to registered handlers of the same kind, in
    /// registration order. Returns `true` as soon as one claims it.
    pub fn handle(&self, error: &ActionError) -> bool {
        self.handlers
            .iter()
            .filter(|(kind, _)| kind == error.kind())
            .any(|(_, handler)| handler(error, self))
    }
}

/// A fully assembled command-line tool: the command tree plus the resolved
/// parser, output sink, handler chain, and presentation settings.
///
/// Build one with [`Tool::builder`], then hand it the process arguments via
/// [`Tool::run_main`] (or [`Tool::run`] to keep control of the exit).
pub struct Tool {
    pub(crate) tree: CommandTree,
    pub(crate) help_tokens: Vec<String>,
    pub(crate) handlers: Vec<(ErrorKind, ErrorHandler)>,
    pub(crate) parser: Arc<dyn InputParser>,
    pub(crate) output: Arc<dyn CommandOutput>,
    pub(crate) print_stack_trace: bool,
    pub(crate) show_banner: bool,
    pub(crate) banner: Option<BannerSupplier>,
    pub(crate) other: Option<Box<Tool>>,
}

impl Tool {
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name)
    }

    /// Convenience assembly: default help tokens, ANSI color when the
    /// environment advertises it, and the given descriptors at the root.
    pub fn with(
        name: impl Into<String>,
        parser: Arc<dyn InputParser>,
        descriptors: Vec<CommandDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut builder = Self::builder(name)
            .input(parser)
            .ansi_color(ansi_env_enabled());
        for descriptor in descriptors {
            builder = builder.command(descriptor)?;
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        self.tree.root().name()
    }

    /// Chains another tool behind this one: its root commands become
    /// reachable from this tool, resolved with its own parser, sink, and
    /// handlers. This tool's commands shadow the other's on a name clash.
    pub fn merge(mut self, other: Tool) -> Tool {
        self.other = Some(Box::new(match self.other.take() {
            Some(existing) => existing.merge(other),
            None => other,
        }));
        self
    }

    /// Sorted visible root commands, including those of merged tools.
    pub fn list_commands(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.tree.root().list_visible().into_iter().collect();
        if let Some(other) = &self.other {
            names.extend(other.list_commands());
        }
        names.into_iter().collect()
    }

    /// Resolves a root-level command, falling through to merged tools.
    pub(crate) fn resolve(&self, token: &str) -> Option<&CommandNode> {
        self.tree.root().resolve(token).or_else(|| {
            self.other
                .as_ref()
                .and_then(|other| other.resolve(token))
        })
    }

    fn context(&self) -> InvocationContext<'_> {
        InvocationContext {
            parser: self.parser.as_ref(),
            output: Arc::clone(&self.output),
            handlers: &self.handlers,
            path: vec![self.name().to_string()],
            help_tokens: &self.help_tokens,
            print_stack_trace: self.print_stack_trace,
        }
    }

    /// Dispatches one argument vector. `Ok(true)` is success, `Ok(false)` a
    /// reported failure, `Err` a warning or unclaimed fatal failure.
    pub fn run(&self, args: &[String]) -> Result<bool, DispatchError> {
        log::debug!("Dispatching {:?} on tool '{}'", args, self.name());
        let mut ctx = self.context();
        self.run_group(self.tree.root(), args, &mut ctx)
    }

    /// Top-level entry point: dispatches, reports warnings and failures on
    /// the configured channels, and (when `exit_process` is set) terminates
    /// the process with a non-zero code on any failure.
    pub fn run_main(&self, args: &[String], exit_process: bool) -> bool {
        let success = match self.run(args) {
            Ok(success) => success,
            Err(DispatchError::Warning(message)) => {
                self.output.warning(OutputValue::Text(message));
                false
            }
            Err(error @ DispatchError::Failure { .. }) => {
                self.output.error(OutputValue::Text(error.to_string()));
                if self.print_stack_trace {
                    self.output.error(OutputValue::Text(format!("{error:?}")));
                }
                false
            }
        };
        if !success && exit_process {
            std::process::exit(EXIT_FAILURE);
        }
        success
    }

    /// Prints the root help summary.
    pub fn help(&self) {
        let ctx = self.context();
        help::group_help(self, self.tree.root(), &ctx, true);
    }

    /// Prints detailed help for every visible command in the tree.
    pub fn deep_help(&self) {
        let ctx = self.context();
        help::deep_help(self, self.tree.root(), &ctx, true);
    }

    fn run_group(
        &self,
        group: &Group,
        args: &[String],
        ctx: &mut InvocationContext<'_>,
    ) -> Result<bool, DispatchError> {
        let is_root = ctx.path.len() == 1;

        let first_is_argument = args
            .first()
            .is_some_and(|first| first.starts_with('-') && group.default_child().is_some());
        let (token, rest): (&str, &[String]) = match args.split_first() {
            Some((first, tail)) if !first_is_argument => (first.as_str(), tail),
            _ => match group.default_child() {
                // An elided command keeps the whole argument vector.
                Some(default) => (default, args),
                None => {
                    let hint = if is_root {
                        ".".to_string()
                    } else {
                        format!(": {} [command]", ctx.path_string())
                    };
                    ctx.output
                        .error(OutputValue::Text(format!("A command was expected{hint}")));
                    help::group_help(self, group, ctx, is_root);
                    return Ok(false);
                }
            },
        };

        // A help token selected as the command asks about this group; a
        // flag-like one was already absorbed by the default child above and
        // reaches the resolved node through `rest`.
        if ctx.is_help_token(token) {
            help::group_help(self, group, ctx, is_root);
            return Ok(true);
        }

        let Some(node) = group.resolve(token) else {
            if is_root {
                if let Some(other) = &self.other {
                    if other.resolve(token).is_some() {
                        return other.run(args);
                    }
                }
            }
            let available = if is_root {
                self.list_commands()
            } else {
                group.list_visible()
            };
            return Err(DispatchError::Warning(format!(
                "No such command: {token}. Available commands: {}",
                available.join(", ")
            )));
        };

        ctx.push(node.name());

        if rest.first().is_some_and(|next| ctx.is_help_token(next)) {
            match node {
                CommandNode::Group(subgroup) => help::group_help(self, subgroup, ctx, false),
                CommandNode::Leaf(leaf) => help::leaf_help(leaf, ctx),
            }
            return Ok(true);
        }

        match node {
            CommandNode::Group(subgroup) => self.run_group(subgroup, rest, ctx),
            CommandNode::Leaf(leaf) => self.invoke_leaf(leaf, rest, ctx),
        }
    }

    fn invoke_leaf(
        &self,
        leaf: &Operation,
        args: &[String],
        ctx: &InvocationContext<'_>,
    ) -> Result<bool, DispatchError> {
        // Resolve every parsed parameter before running the action.
        let mut values = HashMap::new();
        for param in &leaf.params {
            if param.binding != ParamBinding::Parsed {
                continue;
            }
            match ctx
                .parser
                .parse_args(&leaf.name, args, &param.ty, &param.name)
            {
                Ok(value) => {
                    values.insert(param.name.clone(), value);
                }
                Err(input) => {
                    let error = ActionError::from(input);
                    if ctx.handle(&error) {
                        return Ok(false);
                    }
                    ctx.output.error(OutputValue::Text(error.to_string()));
                    return Ok(false);
                }
            }
        }

        let call = ActionArgs {
            output: Arc::clone(&ctx.output),
            raw: args,
            values,
        };
        log::debug!("Invoking '{}'", ctx.path_string());
        match (leaf.action)(&call) {
            Ok(success) => Ok(success),
            Err(error) => {
                if ctx.handle(&error) {
                    return Ok(false);
                }
                if *error.kind() == ErrorKind::Failure {
                    let (message, source) = error.into_parts();
                    return Err(DispatchError::Failure { message, source });
                }
                ctx.output.error(OutputValue::Text(error.to_string()));
                Ok(false)
            }
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{InputError, NullInput};
    use crate::models::{ParamSpec, ParamType, ParamValue};
    use crate::output::channels::Channel;
    use crate::output::sink::MemoryOutput;
    use std::sync::Mutex;

    struct FlagInput;

    impl InputParser for FlagInput {
        fn parse_args(
            &self,
            _command: &str,
            args: &[String],
            ty: &ParamType,
            param: &str,
        ) -> Result<ParamValue, InputError> {
            let flag = format!("--{param}");
            let raw = args
                .iter()
                .position(|arg| *arg == flag)
                .and_then(|index| args.get(index + 1));
            let Some(raw) = raw else {
                return Ok(ParamValue::Absent);
            };
            match ty {
                ParamType::Int => raw
                    .parse::<i64>()
                    .map(ParamValue::Int)
                    .map_err(|_| InputError::new(param, format!("'{raw}' is not an integer"))),
                _ => Ok(ParamValue::Str(raw.clone())),
            }
        }

        fn help(&self, _command: &str, ty: &ParamType, param: &str) -> String {
            format!("  --{param} <{}>", ty.label())
        }
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    fn demo_tool(sink: &Arc<MemoryOutput>) -> Tool {
        let seen = Arc::new(Mutex::new(None::<i64>));
        let descriptor = CommandDescriptor::new("sub")
            .describe("Demo commands. Internal details.")
            .synonym("s")
            .operation(
                Operation::new("go", {
                    let seen = Arc::clone(&seen);
                    move |call| {
                        *seen.lock().unwrap() = call.value("n").as_int();
                        Ok(true)
                    }
                })
                .describe("Runs the demo")
                .param(ParamSpec::parsed("n", ParamType::Int)),
            )
            .operation(Operation::new("fail", |_| {
                Err(ActionError::failure("it broke"))
            }))
            .operation(Operation::new("oops", |_| {
                Err(ActionError::other("minor problem"))
            }));
        Tool::builder("demo")
            .input(Arc::new(FlagInput))
            .output(Arc::clone(sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_successful_leaf_invocation() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(tool.run(&args(&["sub", "go", "--n", "5"])).unwrap());
        assert!(sink.channel(Channel::Error).is_empty());
    }

    #[test]
    fn test_synonym_dispatches_same_command() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(tool.run(&args(&["s", "go"])).unwrap());
    }

    #[test]
    fn test_unknown_command_is_a_warning_with_suggestions() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        let error = tool.run(&args(&["nope"])).unwrap_err();
        match error {
            DispatchError::Warning(message) => {
                assert!(message.contains("No such command: nope"));
                assert!(message.contains("sub"));
            }
            DispatchError::Failure { .. } => panic!("expected a warning"),
        }
    }

    #[test]
    fn test_input_error_reports_and_fails_without_propagating() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        let success = tool.run(&args(&["sub", "go", "--n", "abc"])).unwrap();
        assert!(!success);
        // The default input handler claims the error and points at help.
        let warnings = sink.channel(Channel::Warning);
        assert!(warnings
            .iter()
            .any(|line| line.contains("Input error for [demo sub go]")));
        assert!(warnings.iter().any(|line| line.contains("--n")));
        assert!(warnings
            .iter()
            .any(|line| line.contains("\"demo sub go -h\"")));
        assert!(sink.channel(Channel::Error).is_empty());
    }

    #[test]
    fn test_unclaimed_failure_propagates_with_message() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        let error = tool.run(&args(&["sub", "fail"])).unwrap_err();
        match error {
            DispatchError::Failure { message, .. } => assert_eq!(message, "it broke"),
            DispatchError::Warning(_) => panic!("expected a failure"),
        }
    }

    #[test]
    fn test_other_errors_report_on_error_channel() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(!tool.run(&args(&["sub", "oops"])).unwrap());
        assert_eq!(sink.channel(Channel::Error), vec!["minor problem"]);
    }

    #[test]
    fn test_handler_claims_error_once() {
        let sink = Arc::new(MemoryOutput::new());
        let claimed = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&claimed);
        let descriptor = CommandDescriptor::new("sub").operation(Operation::new("oops", |_| {
            Err(ActionError::other("claimed elsewhere"))
        }));
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .handles(
                ErrorKind::Other,
                Box::new(move |_, _| {
                    *counter.lock().unwrap() += 1;
                    true
                }),
            )
            .build()
            .unwrap();

        assert!(!tool.run(&args(&["sub", "oops"])).unwrap());
        assert_eq!(*claimed.lock().unwrap(), 1);
        // Claimed errors never reach the error channel.
        assert!(sink.channel(Channel::Error).is_empty());
    }

    #[test]
    fn test_handler_kind_must_match_exactly() {
        let sink = Arc::new(MemoryOutput::new());
        let descriptor = CommandDescriptor::new("sub").operation(Operation::new("oops", |_| {
            Err(ActionError::custom("net", "connection refused"))
        }));
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .handles(ErrorKind::Other, Box::new(|_, _| true))
            .build()
            .unwrap();

        assert!(!tool.run(&args(&["sub", "oops"])).unwrap());
        assert_eq!(sink.channel(Channel::Error), vec!["connection refused"]);
    }

    #[test]
    fn test_help_token_prints_group_help_and_succeeds() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(tool.run(&args(&["help"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(lines.iter().any(|line| line.contains("Available commands:")));
        assert!(lines.iter().any(|line| line.contains("sub")));
    }

    #[test]
    fn test_flag_help_token_passes_through_to_the_default_child() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        // The root's single visible child "sub" is its default; "-h" is
        // flag-like, so it is absorbed by the default and asks about "sub"
        // rather than the root.
        assert!(tool.run(&args(&["-h"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(lines.iter().any(|line| line.contains("   go")));
        assert!(!lines.iter().any(|line| line.contains("   sub")));
    }

    #[test]
    fn test_help_token_without_default_describes_the_group() {
        let sink = Arc::new(MemoryOutput::new());
        let descriptor = CommandDescriptor::new("sub")
            .operation(Operation::new("one", |_| Ok(true)))
            .operation(Operation::new("two", |_| Ok(true)));
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .build()
            .unwrap();

        // "sub" has two children and no default, so "-h" has nothing to
        // pass through to and asks about the group itself.
        assert!(tool.run(&args(&["sub", "-h"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(lines.iter().any(|line| line.contains("   one")));
        assert!(lines.iter().any(|line| line.contains("   two")));
    }

    #[test]
    fn test_leaf_help_lists_parsed_params() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(tool.run(&args(&["sub", "go", "--help"])).unwrap());
        let lines = sink.channel(Channel::Output);
        assert!(lines.iter().any(|line| line.contains("--n <integer>")));
    }

    #[test]
    fn test_missing_command_reports_expected_hint() {
        let sink = Arc::new(MemoryOutput::new());
        let descriptor = CommandDescriptor::new("sub")
            .operation(Operation::new("one", |_| Ok(true)))
            .operation(Operation::new("two", |_| Ok(true)));
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .build()
            .unwrap();

        assert!(!tool.run(&args(&["sub"])).unwrap());
        let errors = sink.channel(Channel::Error);
        assert_eq!(errors, vec!["A command was expected: demo sub [command]"]);
    }

    #[test]
    fn test_default_command_elision_keeps_arguments() {
        let sink = Arc::new(MemoryOutput::new());
        // A single-leaf group elides straight through to its only operation,
        // keeping the argument vector intact.
        let single = CommandDescriptor::new("solo-group")
            .operation(Operation::new("run", |call| {
                Ok(call.raw_args() == ["--flag", "x"])
            }));
        let tool = Tool::builder("demo")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(single)
            .unwrap()
            .build()
            .unwrap();
        assert!(tool.run(&args(&["solo-group", "--flag", "x"])).unwrap());
    }

    #[test]
    fn test_merged_tool_commands_are_reachable() {
        let sink = Arc::new(MemoryOutput::new());
        let first = demo_tool(&sink);
        let extra = CommandDescriptor::new("extra")
            .operation(Operation::new("ping", |_| Ok(true)));
        let second = Tool::builder("other")
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(extra)
            .unwrap()
            .build()
            .unwrap();
        let merged = first.merge(second);

        assert!(merged.run(&args(&["extra", "ping"])).unwrap());
        assert!(merged.run(&args(&["sub", "go"])).unwrap());
        let listed = merged.list_commands();
        assert_eq!(listed, vec!["extra".to_string(), "sub".to_string()]);
    }

    #[test]
    fn test_run_main_reports_warning_without_exiting() {
        let sink = Arc::new(MemoryOutput::new());
        let tool = demo_tool(&sink);
        assert!(!tool.run_main(&args(&["nope"]), false));
        let warnings = sink.channel(Channel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("No such command"));
    }

    #[test]
    fn test_null_input_rejects_parsed_params() {
        let sink = Arc::new(MemoryOutput::new());
        let descriptor = CommandDescriptor::new("sub").operation(
            Operation::new("go", |_| Ok(true)).param(ParamSpec::parsed("n", ParamType::Int)),
        );
        let tool = Tool::builder("demo")
            .input(Arc::new(NullInput))
            .output(Arc::clone(&sink) as Arc<dyn CommandOutput>)
            .command(descriptor)
            .unwrap()
            .build()
            .unwrap();

        assert!(!tool.run(&args(&["sub", "go"])).unwrap());
        let warnings = sink.channel(Channel::Warning);
        assert!(warnings.iter().any(|line| line.contains("--n")));
    }
}
