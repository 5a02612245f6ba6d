use tower_lsp::lsp_types::{Position, Range};

use crate::error::LookupError;
use crate::types::{byte_to_utf16_column, line_at, utf16_to_byte_index};

/// Marker for object-literal CSS props such as `<div css={{ color: ... }}>`
pub const CSS_PROP_MARKER: &str = "css={{";

/// Per-request view of the cursor line, read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequestContext {
    pub position: Position,
    pub line_text: String,

    /// Range the editor would replace: the non-whitespace token under the cursor
    pub replace_range: Range,

    /// Whether the line looks like a `css={{ ... }}` object prop
    pub css_property_line: bool,
}

impl CompletionRequestContext {
    pub fn new(line_text: impl Into<String>, position: Position) -> Self {
        let line_text = line_text.into();
        let replace_range = word_range_at(&line_text, position, |c| !c.is_whitespace())
            .unwrap_or_else(|| Range::new(position, position));
        let css_property_line = line_text.contains(CSS_PROP_MARKER);
        Self {
            position,
            line_text,
            replace_range,
            css_property_line,
        }
    }

    /// Build the context for `position` inside a full document
    pub fn from_document(text: &str, position: Position) -> Option<Self> {
        let line = line_at(text, position.line)?;
        Some(Self::new(line, position))
    }
}

/// Characters that make up a variable name token
pub fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Range of the run of `is_token_char` characters touching the cursor column.
///
/// The run may end at the cursor (the token just typed) or start there.
pub fn word_range_at(
    line: &str,
    position: Position,
    is_token_char: impl Fn(char) -> bool,
) -> Option<Range> {
    let cursor = utf16_to_byte_index(line, position.character);
    let before = &line[..cursor];
    let after = &line[cursor..];

    let start = before
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_token_char(c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(cursor);
    let end = after
        .char_indices()
        .find(|&(_, c)| !is_token_char(c))
        .map(|(idx, _)| cursor + idx)
        .unwrap_or(line.len());

    if start == end {
        return None;
    }

    Some(Range::new(
        Position::new(position.line, byte_to_utf16_column(line, start)),
        Position::new(position.line, byte_to_utf16_column(line, end)),
    ))
}

fn slice_range<'a>(line: &'a str, range: Range) -> &'a str {
    let start = utf16_to_byte_index(line, range.start.character);
    let end = utf16_to_byte_index(line, range.end.character);
    &line[start..end]
}

/// Name of the variable under the cursor, for hover and go-to-definition.
///
/// A non-whitespace token containing `var(--` yields the name inside the
/// parentheses (any fallback after a comma is dropped). Otherwise a bare
/// `--name` token under the cursor is used, so declarations themselves resolve.
pub fn variable_at_position(text: &str, position: Position) -> Result<String, LookupError> {
    let line = line_at(text, position.line).ok_or(LookupError::NoRegionFound)?;

    if let Some(range) = word_range_at(line, position, |c| !c.is_whitespace()) {
        let token = slice_range(line, range);
        if token.contains("var(--") {
            return variable_in_var_call(token).ok_or(LookupError::NoRegionFound);
        }
    }

    let range = word_range_at(line, position, is_variable_char).ok_or(LookupError::NoRegionFound)?;
    let name = slice_range(line, range);
    if name.len() > 2 && name.starts_with("--") {
        Ok(name.to_string())
    } else {
        Err(LookupError::NoRegionFound)
    }
}

/// First `(...)` group of a token such as `var(--gap)` or `'var(--gap,4px)'`
fn variable_in_var_call(token: &str) -> Option<String> {
    let open = token.find("var(")? + "var(".len();
    let inner = &token[open..];
    let close = inner.find(')').unwrap_or(inner.len());
    let name = inner[..close].split(',').next()?.trim();
    if name.len() > 2 && name.starts_with("--") {
        Some(name.to_string())
    } else {
        None
    }
}
