use crate::types::{RegionKind, SourceRegion};

/// Iterator over the string literals and line comments of a source text.
///
/// Regions are produced left to right and never overlap. Cloning a scanner
/// forks it at its current offset; call [`scan_regions`] again for a fresh pass.
#[derive(Debug, Clone)]
pub struct RegionScanner<'a> {
    text: &'a str,
    offset: usize,
}

/// Scan `text` for backtick, single and double quoted literals and `//` comments
pub fn scan_regions(text: &str) -> RegionScanner<'_> {
    RegionScanner { text, offset: 0 }
}

impl<'a> Iterator for RegionScanner<'a> {
    type Item = SourceRegion<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        let len = bytes.len();

        while self.offset < len {
            let i = self.offset;
            let b = bytes[i];

            if b == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
                let content_start = i + 2;
                let end = self.text[content_start..]
                    .find('\n')
                    .map(|pos| content_start + pos)
                    .unwrap_or(len);
                self.offset = end;
                let content = self.text[content_start..end]
                    .strip_suffix('\r')
                    .unwrap_or(&self.text[content_start..end]);
                return Some(SourceRegion {
                    kind: RegionKind::Comment,
                    content,
                    start: content_start,
                });
            }

            if b == b'`' || b == b'\'' || b == b'"' {
                match find_closing_delimiter(bytes, i + 1, b) {
                    Some(close) => {
                        self.offset = close + 1;
                        return Some(SourceRegion {
                            kind: RegionKind::StringLiteral,
                            content: &self.text[i + 1..close],
                            start: i + 1,
                        });
                    }
                    // A template literal left open swallows the rest of the source
                    None if b == b'`' => {
                        self.offset = len;
                        return None;
                    }
                    None => {
                        self.offset = i + 1;
                        continue;
                    }
                }
            }

            self.offset += 1;
        }

        None
    }
}

/// Index of the unescaped `quote` closing a literal whose body starts at `from`.
///
/// Single and double quoted literals stop at the end of the line.
fn find_closing_delimiter(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'\n' if quote != b'`' => return None,
            b if b == quote => return Some(j),
            _ => {}
        }
        j += 1;
    }
    None
}
