// src/core/help.rs

use crate::core::dispatch::{InvocationContext, Tool};
use crate::core::registry::{CommandNode, Group};
use crate::models::{Operation, ParamBinding};
use crate::output::color::{AnsiColor, Colorized};
use crate::output::sink::OutputValue;

/// Truncates a description to its first sentence or line, whichever comes
/// first.
pub(crate) fn short_description(text: &str) -> &str {
    let cut = [text.find('\n'), text.find('.')]
        .into_iter()
        .flatten()
        .min();
    match cut {
        Some(index) => text.get(..index).unwrap_or(text),
        None => text,
    }
}

/// Prints the summary for a group: its description, the sorted visible
/// commands with short descriptions, a solo command's own options inline,
/// and the help hint.
pub(crate) fn group_help(tool: &Tool, group: &Group, ctx: &InvocationContext<'_>, is_root: bool) {
    let output = ctx.output();
    if is_root && tool.show_banner {
        if let Some(supplier) = &tool.banner {
            if let Some(banner) = supplier() {
                output.output(OutputValue::Text(banner));
            }
        }
    }
    if let Some(description) = group.description() {
        output.output(OutputValue::Colorized(Colorized::wrapped(
            "\n",
            AnsiColor::White,
            &format!("{}: ", group.name()),
            &format!("{description}\n"),
        )));
    }
    output.output(OutputValue::Text("Available commands:\n".to_string()));

    let names = if is_root {
        tool.list_commands()
    } else {
        group.list_visible()
    };
    let listed: Vec<&CommandNode> = names
        .iter()
        .filter_map(|name| {
            if is_root {
                tool.resolve(name)
            } else {
                group.resolve(name)
            }
        })
        .filter(|node| !node.is_solo())
        .collect();
    let width = listed
        .iter()
        .map(|node| node.name().len())
        .max()
        .unwrap_or(0);
    for node in &listed {
        let short = node.description().map(short_description).unwrap_or("");
        let padding = " ".repeat(width.saturating_sub(node.name().len()));
        output.output(OutputValue::Colorized(Colorized::wrapped(
            "",
            AnsiColor::Yellow,
            &format!("   {}", node.name()),
            &format!("{padding} - {short}"),
        )));
    }

    if let Some(CommandNode::Leaf(solo)) = group.children.values().find(|node| node.is_solo()) {
        leaf_help(solo, ctx);
    }

    output.output(OutputValue::Text(String::new()));
    output.output(OutputValue::Colorized(Colorized::whole(
        AnsiColor::Green,
        format!(
            "Use \"{} [command] help\" to get help on any command.",
            ctx.path_string()
        ),
    )));
}

/// Prints the help for a single operation: its description and one line per
/// declared parameter, rendered by the configured input parser.
pub(crate) fn leaf_help(leaf: &Operation, ctx: &InvocationContext<'_>) {
    let output = ctx.output();
    if let Some(description) = &leaf.description {
        output.output(OutputValue::Colorized(Colorized::whole(
            AnsiColor::White,
            format!("{description}\n"),
        )));
    }
    let parsed: Vec<_> = leaf
        .params
        .iter()
        .filter(|param| param.binding == ParamBinding::Parsed)
        .collect();
    if parsed.is_empty() {
        output.output(OutputValue::Colorized(Colorized::whole(
            AnsiColor::Green,
            "(no options for this command)",
        )));
        return;
    }
    for param in parsed {
        let line = ctx.parser().help(&leaf.name, &param.ty, &param.name);
        output.output(OutputValue::Text(line));
    }
}

/// Walks the whole tree and prints a detailed section per command, visible
/// ones only.
pub(crate) fn deep_help(tool: &Tool, group: &Group, ctx: &InvocationContext<'_>, is_root: bool) {
    let output = ctx.output();
    for name in group.list_visible() {
        let Some(node) = group.resolve(&name) else {
            continue;
        };
        output.output(OutputValue::Text("--------------------".to_string()));
        output.output(OutputValue::Text(format!("+ Command: {name}")));
        if !node.synonyms().is_empty() {
            output.output(OutputValue::Text(format!(
                "+ Synonyms: {}",
                node.synonyms().join(", ")
            )));
        }
        match node {
            CommandNode::Group(subgroup) => {
                let inner = ctx.descend(&name);
                group_help(tool, subgroup, &inner, false);
                deep_help(tool, subgroup, &inner, false);
            }
            CommandNode::Leaf(leaf) => leaf_help(leaf, ctx),
        }
    }
    if is_root {
        if let Some(other) = &tool.other {
            other.help();
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description_cuts_at_first_period() {
        assert_eq!(
            short_description("Starts the job. Extra details follow."),
            "Starts the job"
        );
    }

    #[test]
    fn test_short_description_cuts_at_first_newline() {
        assert_eq!(short_description("First line\nsecond line."), "First line");
    }

    #[test]
    fn test_short_description_prefers_earliest_cut() {
        assert_eq!(short_description("a.b\nc"), "a");
        assert_eq!(short_description("a\nb.c"), "a");
    }

    #[test]
    fn test_short_description_without_terminator_is_whole_text() {
        assert_eq!(short_description("plain text"), "plain text");
    }
}
