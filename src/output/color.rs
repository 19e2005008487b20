// src/output/color.rs

use thiserror::Error;

/// An ANSI foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Reset,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl AnsiColor {
    /// The raw ANSI escape code for this color.
    pub fn code(self) -> &'static str {
        match self {
            Self::Reset => "\x1b[0m",
            Self::Black => "\x1b[30m",
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Magenta => "\x1b[35m",
            Self::Cyan => "\x1b[36m",
            Self::White => "\x1b[37m",
        }
    }
}

#[derive(Error, Debug)]
#[error("Unknown color name: '{0}'")]
pub struct ColorNameError(String);

/// Parses a color name string (e.g., "red", "green") into an [`AnsiColor`].
pub fn parse_color_name(name: &str) -> Result<AnsiColor, ColorNameError> {
    match name.to_lowercase().as_str() {
        "reset" => Ok(AnsiColor::Reset),
        "black" => Ok(AnsiColor::Black),
        "red" => Ok(AnsiColor::Red),
        "green" => Ok(AnsiColor::Green),
        "yellow" => Ok(AnsiColor::Yellow),
        "blue" => Ok(AnsiColor::Blue),
        "magenta" => Ok(AnsiColor::Magenta),
        "cyan" => Ok(AnsiColor::Cyan),
        "white" => Ok(AnsiColor::White),
        _ => Err(ColorNameError(name.to_string())),
    }
}

/// A colored region over a string. Offsets and lengths are in characters.
///
/// A `None` length means the span stays open until a later span (or the end
/// of the string) closes it; open spans nest by count. Bounded spans wrap
/// exactly `length` characters and reset immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSpan {
    pub start: usize,
    pub length: Option<usize>,
    pub color: AnsiColor,
}

impl ColorSpan {
    pub fn bounded(start: usize, length: usize, color: AnsiColor) -> Self {
        Self {
            start,
            length: Some(length),
            color,
        }
    }

    pub fn open(start: usize, color: AnsiColor) -> Self {
        Self {
            start,
            length: None,
            color,
        }
    }
}

/// An immutable pair of a plain string and its colored sub-regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colorized {
    text: String,
    spans: Vec<ColorSpan>,
}

impl Colorized {
    pub fn new(text: impl Into<String>, spans: Vec<ColorSpan>) -> Self {
        Self {
            text: text.into(),
            spans,
        }
    }

    /// Colors the whole string with one open span.
    pub fn whole(color: AnsiColor, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            spans: vec![ColorSpan::open(0, color)],
            text,
        }
    }

    /// Template-style wrapping: an uncolored prefix, a colored middle, an
    /// uncolored suffix.
    pub fn wrapped(prefix: &str, color: AnsiColor, wrapped: &str, suffix: &str) -> Self {
        let span = ColorSpan::bounded(
            prefix.chars().count(),
            wrapped.chars().count(),
            color,
        );
        Self {
            text: format!("{prefix}{wrapped}{suffix}"),
            spans: vec![span],
        }
    }

    /// The plain string, spans stripped.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[ColorSpan] {
        &self.spans
    }

    /// The escape-coded rendition of this value.
    pub fn render(&self) -> String {
        render(&self.text, &self.spans)
    }
}

/// Renders `text` with escape codes for the given spans, in one pass.
///
/// Spans are sorted by start ascending (stable on ties). Entering a span
/// while an open span is active emits one RESET and closes it; bounded spans
/// wrap their characters and reset immediately; open spans stay active until
/// a later span or the end of the string closes them.
pub fn render(text: &str, spans: &[ColorSpan]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut sorted: Vec<&ColorSpan> = spans.iter().collect();
    sorted.sort_by_key(|span| span.start);

    let mut out = String::with_capacity(text.len() + sorted.len() * 10);
    let mut cursor = 0usize;
    let mut open = 0usize;
    for span in sorted {
        if open > 0 {
            out.push_str(AnsiColor::Reset.code());
            open -= 1;
        }
        if span.start > cursor {
            out.extend(chars.get(cursor..span.start).unwrap_or_default());
        }
        cursor = span.start.min(chars.len());
        out.push_str(span.color.code());
        match span.length {
            Some(length) => {
                let end = (cursor + length).min(chars.len());
                out.extend(chars.get(cursor..end).unwrap_or_default());
                cursor = end;
                out.push_str(AnsiColor::Reset.code());
            }
            None => open += 1,
        }
    }
    if cursor < chars.len() {
        out.extend(chars.get(cursor..).unwrap_or_default());
    }
    if open > 0 {
        out.push_str(AnsiColor::Reset.code());
    }
    out
}

// MARK: --- UNIT TESTS ---
