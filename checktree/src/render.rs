//! Text rendering of report trees for the terminal.

use std::fmt::Write;

use colored::{ColoredString, Colorize};
use serde_json::Value;

use crate::core::outcome::OutcomeState;
use crate::core::report::{Report, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
    pub indent: usize,
    pub show_messages: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: false,
            indent: 2,
            show_messages: true,
        }
    }
}

/// Render `report` as an indented tree, one line per node.
pub fn render(report: &Report, options: &RenderOptions) -> String {
    let mut out = String::new();
    render_node(report, 0, options, &mut out);
    out
}

/// One-line leaf count summary.
pub fn render_summary(summary: &Summary, options: &RenderOptions) -> String {
    let line = format!(
        "{} units: {} passed, {} failed, {} invalid, {} unknown",
        summary.total, summary.succeeded, summary.failed, summary.invalid, summary.unknown
    );
    if !options.color {
        return line;
    }
    if summary.failed > 0 || summary.invalid > 0 {
        line.red().bold().to_string()
    } else {
        line.green().bold().to_string()
    }
}

fn render_node(report: &Report, depth: usize, options: &RenderOptions, out: &mut String) {
    let pad = " ".repeat(depth * options.indent);
    let state = report.state();
    let marker = paint(marker(state), state, options);

    match report {
        Report::Outcome(outcome) => {
            let _ = write!(out, "{pad}{marker} {}", outcome.key);
            if options.show_messages && !is_blank(&outcome.message) {
                let _ = write!(out, ": {}", message_text(&outcome.message));
            }
            out.push('\n');
        }
        Report::Aggregate(aggregate) => {
            let key = if options.color {
                aggregate.key().bold().to_string()
            } else {
                aggregate.key().to_string()
            };
            let _ = writeln!(out, "{pad}{marker} {key}");
            for child in aggregate.results() {
                render_node(child, depth + 1, options, out);
            }
        }
    }
}

fn marker(state: OutcomeState) -> &'static str {
    match state {
        OutcomeState::Success => "✓",
        OutcomeState::Failure => "✗",
        OutcomeState::Invalid => "!",
        OutcomeState::Unknown => "?",
    }
}

fn paint(text: &str, state: OutcomeState, options: &RenderOptions) -> String {
    if !options.color {
        return text.to_string();
    }
    let painted: ColoredString = match state {
        OutcomeState::Success => text.green(),
        OutcomeState::Failure => text.red(),
        OutcomeState::Invalid => text.magenta().bold(),
        OutcomeState::Unknown => text.yellow(),
    };
    painted.to_string()
}

fn is_blank(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Strings are shown bare, everything else as compact JSON.
fn message_text(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
