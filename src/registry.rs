use std::collections::HashSet;

use tower_lsp::lsp_types::{Range, Url};

use crate::types::VariableDeclaration;

/// First-wins set of declarations for a single extraction pass over one document.
///
/// A registry is created per pass and consumed by [`VariableRegistry::into_declarations`],
/// so nothing leaks between documents or between passes.
#[derive(Debug)]
pub struct VariableRegistry {
    uri: Url,
    seen: HashSet<String>,
    declarations: Vec<VariableDeclaration>,
}

impl VariableRegistry {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            seen: HashSet::new(),
            declarations: Vec::new(),
        }
    }

    /// Store a declaration unless its name is taken or its value is empty.
    ///
    /// Returns whether the declaration was stored.
    pub fn insert(&mut self, name: &str, raw_value: &str, range: Range) -> bool {
        if self.seen.contains(name) {
            return false;
        }

        let value = normalize_value(raw_value);
        if value.is_empty() {
            return false;
        }

        self.seen.insert(name.to_string());
        self.declarations.push(VariableDeclaration {
            name: name.to_string(),
            value: value.to_string(),
            uri: self.uri.clone(),
            range,
        });
        true
    }

    /// Declarations in first-seen order
    pub fn into_declarations(self) -> Vec<VariableDeclaration> {
        self.declarations
    }
}

/// Trim a raw value and drop one delimiter that leaked in from region scanning
fn normalize_value(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(['`', '\'', '"', ';'])
        .unwrap_or(trimmed)
        .trim_end()
}
