use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Documentation, MarkupContent,
    MarkupKind, Position, Range, TextEdit,
};

use crate::color::{build_hover_payload, value_kind};
use crate::context::{is_variable_char, CompletionRequestContext};
use crate::types::{byte_to_utf16_column, utf16_to_byte_index, VariableDeclaration};

const VAR_OPEN: &str = "var(";

/// Which rule of the insertion cascade produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionRule {
    /// Cursor inside an unclosed `var(` partial name
    CompleteVarCall,
    /// `var(` appears somewhere on the line
    BareName,
    /// Object-literal `css={{` line, value must be a quoted string
    QuotedVarCall,
    /// Plain `var(--name)`
    VarCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    pub range: Range,
    pub rule: InsertionRule,
}

/// Decide the text to insert for `name` and the range it replaces.
///
/// This is a line-text heuristic, evaluated in order:
/// 1. an unclosed `var(` before the cursor whose argument is the partial name being
///    typed: complete the name in place and close the call if nothing closes it;
/// 2. `var(` anywhere else on the line: insert the bare `--name`;
/// 3. a `css={{` line: insert `'var(--name)'`;
/// 4. otherwise insert `var(--name)`.
///
/// `cursor` is the caller's position on the line; `replace_range` may extend past it.
pub fn resolve_insertion(
    name: &str,
    cursor: Position,
    replace_range: Range,
    line_text: &str,
    css_property_line: bool,
) -> Insertion {
    if let Some(insertion) = complete_open_var_call(name, cursor, line_text) {
        return insertion;
    }

    let (text, rule) = if line_text.contains(VAR_OPEN) {
        (name.to_string(), InsertionRule::BareName)
    } else if css_property_line {
        (format!("'var({name})'"), InsertionRule::QuotedVarCall)
    } else {
        (format!("var({name})"), InsertionRule::VarCall)
    };

    Insertion {
        text,
        range: replace_range,
        rule,
    }
}

fn complete_open_var_call(name: &str, position: Position, line: &str) -> Option<Insertion> {
    let cursor = utf16_to_byte_index(line, position.character);
    let open = line[..cursor].rfind(VAR_OPEN)?;
    let arg_start = open + VAR_OPEN.len();

    // Only a partial variable token may sit between `var(` and the cursor
    let typed = &line[arg_start..cursor];
    if !typed.chars().all(is_variable_char) {
        return None;
    }

    let dashes = typed.len() - typed.trim_start_matches('-').len();
    if dashes > 2 {
        return None;
    }
    let name_start = arg_start + dashes;

    let rest = &line[cursor..];
    let partial_tail = rest
        .char_indices()
        .find(|&(_, c)| !is_variable_char(c))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    let close = rest.find(')');

    let (end, text) = match close {
        Some(close) => (cursor + close, name[dashes.min(name.len())..].to_string()),
        None => (
            cursor + partial_tail,
            format!("{})", &name[dashes.min(name.len())..]),
        ),
    };

    Some(Insertion {
        text,
        range: Range::new(
            Position::new(position.line, byte_to_utf16_column(line, name_start)),
            Position::new(position.line, byte_to_utf16_column(line, end)),
        ),
        rule: InsertionRule::CompleteVarCall,
    })
}

/// What a completion list entry for one declaration looks like
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPayload {
    pub label: String,
    pub insert_text: String,
    pub filter_text: String,
    pub replace_range: Range,
    pub preview_kind: CompletionItemKind,
    pub preview_detail: String,
    pub documentation: String,
}

pub fn build_completion_payload(
    declaration: &VariableDeclaration,
    context: &CompletionRequestContext,
    color_preview: bool,
) -> CompletionPayload {
    let insertion = resolve_insertion(
        &declaration.name,
        context.position,
        context.replace_range,
        &context.line_text,
        context.css_property_line,
    );

    // Editors filter on the replaced text, which excludes typed dashes in the in-place case
    let filter_text = match insertion.rule {
        InsertionRule::CompleteVarCall => declaration.bare_name().to_string(),
        _ => declaration.name.clone(),
    };

    let documentation = build_hover_payload(&declaration.value, color_preview);

    CompletionPayload {
        label: declaration.name.clone(),
        insert_text: insertion.text,
        filter_text,
        replace_range: insertion.range,
        preview_kind: value_kind(&declaration.value),
        preview_detail: declaration.value.clone(),
        documentation,
    }
}

impl From<CompletionPayload> for CompletionItem {
    fn from(payload: CompletionPayload) -> Self {
        CompletionItem {
            label: payload.label,
            kind: Some(payload.preview_kind),
            detail: Some(payload.preview_detail),
            documentation: Some(Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: payload.documentation,
            })),
            filter_text: Some(payload.filter_text),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: payload.replace_range,
                new_text: payload.insert_text,
            })),
            ..Default::default()
        }
    }
}
