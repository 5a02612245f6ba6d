use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{Position, Range, Url};
use tracing::trace;

use super::regions::scan_regions;
use crate::registry::VariableRegistry;
use crate::types::{RegionKind, VariableDeclaration};

/// Column every declaration range starts at.
///
/// Declarations are assumed to sit one indentation level (four spaces) inside
/// their template literal. Declarations at any other depth get a range that is
/// off horizontally; the line is always right.
pub const DECLARATION_START_COLUMN: u32 = 4;

static DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(--[a-z0-9-]+):([^;]*)").expect("declaration pattern is valid")
});

/// A declaration as matched inside one region, before deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeclaration<'a> {
    pub name: &'a str,
    pub raw_value: &'a str,

    /// Byte offset of the name within the region content
    pub offset: usize,

    /// Byte offset of the name within the full source
    pub absolute_offset: usize,
}

/// Every `--name: value` match of one region, in order
#[derive(Debug, Clone)]
pub struct DeclarationMatches<'a> {
    content: &'a str,
    region_start: usize,
    offset: usize,
}

/// Find all declarations in a region's interior text.
///
/// `region_start` is the byte offset of `content` in the full source.
pub fn parse_declarations(content: &str, region_start: usize) -> DeclarationMatches<'_> {
    DeclarationMatches {
        content,
        region_start,
        offset: 0,
    }
}

impl<'a> Iterator for DeclarationMatches<'a> {
    type Item = RawDeclaration<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset > self.content.len() {
            return None;
        }

        let captures = DECLARATION_PATTERN.captures_at(self.content, self.offset)?;
        let whole = captures.get(0)?;
        let name = captures.get(1)?;
        let value = captures.get(2)?;

        self.offset = whole.end().max(self.offset + 1);

        Some(RawDeclaration {
            name: name.as_str(),
            raw_value: value.as_str(),
            offset: name.start(),
            absolute_offset: self.region_start + name.start(),
        })
    }
}

/// Tracks the line number of increasing byte offsets without rescanning the source.
struct LineTracker<'a> {
    text: &'a str,
    scanned_to: usize,
    line: u32,
}

impl<'a> LineTracker<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            scanned_to: 0,
            line: 0,
        }
    }

    fn line_of(&mut self, offset: usize) -> u32 {
        let offset = offset.min(self.text.len());
        if offset >= self.scanned_to {
            self.line += self.text.as_bytes()[self.scanned_to..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count() as u32;
        } else {
            self.line = self.text.as_bytes()[..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count() as u32;
        }
        self.scanned_to = offset;
        self.line
    }
}

/// Extract the deduplicated variable declarations of one document.
///
/// Comments are skipped, only string and template literals are searched. The
/// first declaration of a name wins.
pub fn extract_declarations(text: &str, uri: &Url) -> Vec<VariableDeclaration> {
    let mut registry = VariableRegistry::new(uri.clone());
    let mut lines = LineTracker::new(text);

    for region in scan_regions(text) {
        if region.kind == RegionKind::Comment {
            continue;
        }

        for raw in parse_declarations(region.content, region.start) {
            let line = lines.line_of(raw.absolute_offset);
            let range = declaration_range(line, raw.name);
            if !registry.insert(raw.name, raw.raw_value, range) {
                trace!(name = raw.name, %uri, "skipped duplicate or empty declaration");
            }
        }
    }

    registry.into_declarations()
}

fn declaration_range(line: u32, name: &str) -> Range {
    let end = DECLARATION_START_COLUMN + name.encode_utf16().count() as u32;
    Range::new(
        Position::new(line, DECLARATION_START_COLUMN),
        Position::new(line, end),
    )
}
