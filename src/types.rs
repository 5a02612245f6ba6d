use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Range, Url};

use crate::runtime_config::RuntimeConfig;

/// A `--name: value` declaration found inside a string literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Variable name (e.g., "--primary-color")
    pub name: String,

    /// Declared value with surrounding whitespace and a leaked delimiter removed
    pub value: String,

    /// Document URI where the variable is declared
    pub uri: Url,

    /// Range covering the variable name, used for go-to-definition
    pub range: Range,
}

impl VariableDeclaration {
    /// Name without the leading `--` marker
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix("--").unwrap_or(&self.name)
    }
}

/// Kind of region produced by the string region scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    StringLiteral,
    Comment,
}

/// A quoted literal or line comment located in a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRegion<'a> {
    pub kind: RegionKind,

    /// Text between the delimiters (or after `//` for comments)
    pub content: &'a str,

    /// Byte offset of `content` within the full source
    pub start: usize,
}

/// A discovered document handed to the lookup index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub uri: Url,
    pub text: String,
}

impl SourceText {
    pub fn new(uri: Url, text: impl Into<String>) -> Self {
        Self {
            uri,
            text: text.into(),
        }
    }
}

/// Configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// File patterns scanned for variable declarations
    pub lookup_files: Vec<String>,

    /// Glob patterns to ignore
    pub ignore_globs: Vec<String>,

    /// Language ids that get completion, hover and definition
    pub enabled_languages: Vec<String>,

    /// Render color swatches in hover and completion documentation
    pub enable_color_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup_files: vec!["**/*.globals.{ts,js}".to_string()],
            ignore_globs: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/out/**".to_string(),
                "**/.git/**".to_string(),
            ],
            enabled_languages: vec![
                "javascript".to_string(),
                "typescript".to_string(),
                "javascriptreact".to_string(),
                "typescriptreact".to_string(),
            ],
            enable_color_preview: true,
        }
    }
}

impl Config {
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        let mut config = Config::default();
        if let Some(lookup) = &runtime.lookup_files {
            if !lookup.is_empty() {
                config.lookup_files = lookup.clone();
            }
        }
        if let Some(ignore) = &runtime.ignore_globs {
            if !ignore.is_empty() {
                config.ignore_globs = ignore.clone();
            }
        }
        if let Some(languages) = &runtime.enabled_languages {
            if !languages.is_empty() {
                config.enabled_languages = languages.clone();
            }
        }
        config.enable_color_preview = runtime.enable_color_preview;
        config
    }

    /// Apply client supplied `initializationOptions` on top of this config
    pub fn apply_init_options(&mut self, options: InitOptions) {
        if let Some(lookup) = options.lookup_files.filter(|v| !v.is_empty()) {
            self.lookup_files = lookup;
        }
        if let Some(ignore) = options.ignore_globs {
            self.ignore_globs = ignore;
        }
        if let Some(languages) = options.languages.filter(|v| !v.is_empty()) {
            self.enabled_languages = languages;
        }
        if let Some(preview) = options.color_preview {
            self.enable_color_preview = preview;
        }
    }

    pub fn is_language_enabled(&self, language_id: &str) -> bool {
        self.enabled_languages
            .iter()
            .any(|lang| lang.eq_ignore_ascii_case(language_id))
    }
}

/// Options accepted in the `initialize` request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOptions {
    pub lookup_files: Option<Vec<String>>,
    pub ignore_globs: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub color_preview: Option<bool>,
}

/// Helper to convert LSP Position to byte offset
pub fn position_to_offset(text: &str, position: Position) -> Option<usize> {
    let mut line = 0;
    let mut character = 0;

    for (idx, ch) in text.char_indices() {
        if line == position.line && character == position.character {
            return Some(idx);
        }
        if ch == '\n' {
            if line == position.line {
                // Columns past the end of a line clamp to the line end
                return Some(idx);
            }
            line += 1;
            character = 0;
        } else {
            character += ch.len_utf16() as u32;
        }
    }

    if line == position.line {
        Some(text.len())
    } else {
        None
    }
}

/// Text of the given zero-based line without its terminator
pub fn line_at(text: &str, line: u32) -> Option<&str> {
    text.split('\n')
        .nth(line as usize)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Byte index within `line` for a UTF-16 column, clamped to the line length
pub fn utf16_to_byte_index(line: &str, column: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= column {
            return idx;
        }
        units += ch.len_utf16() as u32;
    }
    line.len()
}

/// UTF-16 column for a byte index within `line`
pub fn byte_to_utf16_column(line: &str, byte_index: usize) -> u32 {
    line[..byte_index.min(line.len())]
        .chars()
        .map(|ch| ch.len_utf16() as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_to_offset_crosses_lines() {
        let text = "const a = `\n  --x: 1;\n`";
        let offset = text.find("--x").unwrap();
        assert_eq!(position_to_offset(text, Position::new(1, 2)), Some(offset));
    }

    #[test]
    fn position_past_line_end_clamps() {
        let text = "ab\ncd";
        assert_eq!(position_to_offset(text, Position::new(0, 10)), Some(2));
        assert_eq!(position_to_offset(text, Position::new(1, 10)), Some(5));
        assert_eq!(position_to_offset(text, Position::new(4, 0)), None);
    }

    #[test]
    fn line_at_strips_carriage_returns() {
        let text = "first\r\nsecond\r\n";
        assert_eq!(line_at(text, 0), Some("first"));
        assert_eq!(line_at(text, 1), Some("second"));
        assert_eq!(line_at(text, 2), Some(""));
        assert_eq!(line_at(text, 3), None);
    }

    #[test]
    fn utf16_columns_map_to_bytes() {
        let line = "é var(--a";
        assert_eq!(utf16_to_byte_index(line, 1), 2);
        assert_eq!(byte_to_utf16_column(line, 2), 1);
        assert_eq!(utf16_to_byte_index(line, 99), line.len());
    }

    #[test]
    fn init_options_override_config() {
        let mut config = Config::default();
        let options: InitOptions = serde_json::from_value(serde_json::json!({
            "lookupFiles": ["src/theme.ts"],
            "languages": ["typescriptreact"],
            "colorPreview": false
        }))
        .unwrap();

        config.apply_init_options(options);

        assert_eq!(config.lookup_files, vec!["src/theme.ts".to_string()]);
        assert!(config.is_language_enabled("TypeScriptReact"));
        assert!(!config.is_language_enabled("javascript"));
        assert!(!config.enable_color_preview);
        assert_eq!(config.ignore_globs, Config::default().ignore_globs);
    }
}
