use tower_lsp::lsp_types::Url;

use crate::parsers::extract_declarations;
use crate::types::{SourceText, VariableDeclaration};

/// Merged declarations of the active document and every discovered source.
///
/// Built fresh for each request. The active document comes first so that a
/// name search returning the first match prefers its declarations.
#[derive(Debug, Clone, Default)]
pub struct VariableLookupIndex {
    declarations: Vec<VariableDeclaration>,
}

impl VariableLookupIndex {
    /// Extract every document and concatenate the results, active document first.
    ///
    /// `sources` must be in discovery order; a source with the active document's
    /// URI is skipped since its live text is already included.
    pub fn resolve(active: Option<(&Url, &str)>, sources: &[SourceText]) -> Self {
        let mut declarations = Vec::new();

        if let Some((uri, text)) = active {
            declarations.extend(extract_declarations(text, uri));
        }

        let active_uri = active.map(|(uri, _)| uri);
        for source in sources {
            if Some(&source.uri) == active_uri {
                continue;
            }
            declarations.extend(extract_declarations(&source.text, &source.uri));
        }

        Self { declarations }
    }

    pub fn declarations(&self) -> &[VariableDeclaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// All declarations of `name`, highest priority first
    pub fn lookup_by_name(&self, name: &str) -> Vec<&VariableDeclaration> {
        lookup_declarations_by_name(name, &self.declarations)
    }

    /// The declaration of `name` that wins under first-match lookup
    pub fn first_by_name(&self, name: &str) -> Option<&VariableDeclaration> {
        self.declarations.iter().find(|decl| decl.name == name)
    }

    /// One declaration per name, keeping the highest priority one
    pub fn unique(&self) -> Vec<&VariableDeclaration> {
        let mut seen = std::collections::HashSet::new();
        self.declarations
            .iter()
            .filter(|decl| seen.insert(decl.name.as_str()))
            .collect()
    }
}

/// Every declaration named `name`, in set order
pub fn lookup_declarations_by_name<'a>(
    name: &str,
    declarations: &'a [VariableDeclaration],
) -> Vec<&'a VariableDeclaration> {
    declarations.iter().filter(|decl| decl.name == name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, text: &str) -> SourceText {
        SourceText::new(Url::parse(&format!("file:///{path}")).unwrap(), text)
    }

    #[test]
    fn resolve_puts_active_document_first() {
        let sources = vec![
            source("a.globals.ts", "css`\n    --gap: 8px;\n    --a: 1;\n`"),
            source("b.globals.ts", "css`\n    --gap: 4px;\n`"),
        ];
        let active_uri = Url::parse("file:///app.tsx").unwrap();
        let active_text = "const s = `\n    --gap: 2px;\n`";

        let index = VariableLookupIndex::resolve(Some((&active_uri, active_text)), &sources);

        let gaps = index.lookup_by_name("--gap");
        assert_eq!(gaps.len(), 3);
        assert_eq!(gaps[0].uri, active_uri);
        assert_eq!(gaps[1].value, "8px");
        assert_eq!(gaps[2].value, "4px");
        assert_eq!(index.first_by_name("--gap").unwrap().value, "2px");
    }

    #[test]
    fn resolve_skips_stale_copy_of_active_source() {
        let sources = vec![source("a.globals.ts", "css`\n    --old: 1;\n`")];
        let uri = sources[0].uri.clone();

        let index = VariableLookupIndex::resolve(Some((&uri, "css`\n    --new: 2;\n`")), &sources);

        assert_eq!(index.len(), 1);
        assert_eq!(index.declarations()[0].name, "--new");
    }

    #[test]
    fn resolve_without_active_keeps_discovery_order() {
        let sources = vec![
            source("b.globals.ts", "css`--x: b;`"),
            source("a.globals.ts", "css`--x: a;`"),
        ];
        let index = VariableLookupIndex::resolve(None, &sources);
        let values: Vec<_> = index.lookup_by_name("--x").iter().map(|d| d.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a"]);
        assert_eq!(index.unique().len(), 1);
    }

    #[test]
    fn lookup_missing_name_is_empty() {
        let index = VariableLookupIndex::resolve(None, &[]);
        assert!(index.is_empty());
        assert!(index.lookup_by_name("--nope").is_empty());
        assert!(index.first_by_name("--nope").is_none());
    }
}
