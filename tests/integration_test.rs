use styled_vars_lsp::color::build_hover_payload;
use styled_vars_lsp::completion::{build_completion_payload, resolve_insertion, InsertionRule};
use styled_vars_lsp::context::{variable_at_position, CompletionRequestContext};
use styled_vars_lsp::index::{lookup_declarations_by_name, VariableLookupIndex};
use styled_vars_lsp::manager::VariableManager;
use styled_vars_lsp::parsers::extract_declarations;
use styled_vars_lsp::types::{Config, SourceText};
use tower_lsp::lsp_types::{CompletionItemKind, Position, Range, Url};

const GLOBALS: &str = r#"import { createGlobalStyle, css } from "styled-components";

export const theme = css`
    --primary-color: #336699;
    --surface: rgba(255, 255, 255, 0.9);
    --gap: 8px;
    --radius: 4px;
`;

// --commented-out: red;
export const Global = createGlobalStyle`
    :root {
        --gap: 16px;
        --font-stack: "Inter", sans-serif;
    }
`;
"#;

fn uri(path: &str) -> Url {
    Url::parse(&format!("file:///workspace/{path}")).unwrap()
}

fn names(decls: &[styled_vars_lsp::types::VariableDeclaration]) -> Vec<&str> {
    decls.iter().map(|d| d.name.as_str()).collect()
}

/// Extraction over a realistic globals file
#[test]
fn test_extract_globals_file() {
    let decls = extract_declarations(GLOBALS, &uri("theme.globals.ts"));

    assert_eq!(
        names(&decls),
        vec![
            "--primary-color",
            "--surface",
            "--gap",
            "--radius",
            "--font-stack"
        ]
    );

    // Example 1
    let primary = &decls[0];
    assert_eq!(primary.value, "#336699");
    assert_eq!(
        primary.range,
        Range::new(Position::new(3, 4), Position::new(3, 19))
    );

    // Example 2: the first `--gap` wins, even across template literals
    let gap: Vec<_> = decls.iter().filter(|d| d.name == "--gap").collect();
    assert_eq!(gap.len(), 1);
    assert_eq!(gap[0].value, "8px");
    assert_eq!(gap[0].range.start.line, 5);

    let font = decls.iter().find(|d| d.name == "--font-stack").unwrap();
    assert_eq!(font.value, r#""Inter", sans-serif"#);
}

#[test]
fn test_extraction_properties() {
    let globals = uri("theme.globals.ts");
    let first = extract_declarations(GLOBALS, &globals);
    let second = extract_declarations(GLOBALS, &globals);

    // Idempotent
    assert_eq!(first, second);

    for decl in &first {
        assert!(decl.name.starts_with("--") && decl.name.len() > 2);
        assert!(!decl.value.is_empty());
        assert_eq!(decl.uri, globals);
    }

    // Names are unique within one document
    let mut seen = std::collections::HashSet::new();
    assert!(first.iter().all(|d| seen.insert(d.name.clone())));

    // Comment-only declarations never appear
    assert!(first.iter().all(|d| d.name != "--commented-out"));
}

#[test]
fn test_empty_values_and_plain_code_are_ignored() {
    let text = "const a = 1;\nconst b = css`\n    --empty: ;\n    --empty: blue;\n`;\nconst c = a --b;";
    let decls = extract_declarations(text, &uri("a.ts"));

    assert_eq!(names(&decls), vec!["--empty"]);
    assert_eq!(decls[0].value, "blue");
    assert_eq!(decls[0].range.start.line, 3);
}

/// Example 3: completing an unclosed `var(`
#[test]
fn test_completion_inside_open_var_call() {
    let line = "  color: var(--prim";
    let decls = extract_declarations(GLOBALS, &uri("theme.globals.ts"));
    let context = CompletionRequestContext::new(line, Position::new(0, 19));

    let payload = build_completion_payload(&decls[0], &context, true);

    assert_eq!(payload.insert_text, "primary-color)");
    assert_eq!(
        payload.replace_range,
        Range::new(Position::new(0, 15), Position::new(0, 19))
    );
    assert_eq!(payload.filter_text, "primary-color");
    assert_eq!(payload.preview_kind, CompletionItemKind::COLOR);

    let start = payload.replace_range.start.character as usize;
    let end = payload.replace_range.end.character as usize;
    let completed = format!("{}{}{}", &line[..start], payload.insert_text, &line[end..]);
    assert_eq!(completed, "  color: var(--primary-color)");
}

/// Example 3 with the closing parenthesis already in place
#[test]
fn test_completion_inside_closed_var_call() {
    let line = "  padding: var(--g);";
    let decls = extract_declarations(GLOBALS, &uri("theme.globals.ts"));
    let gap = decls.iter().find(|d| d.name == "--gap").unwrap();
    let context = CompletionRequestContext::new(line, Position::new(0, 18));

    let payload = build_completion_payload(gap, &context, false);

    assert_eq!(payload.insert_text, "gap");
    let start = payload.replace_range.start.character as usize;
    let end = payload.replace_range.end.character as usize;
    let completed = format!("{}{}{}", &line[..start], payload.insert_text, &line[end..]);
    assert_eq!(completed, "  padding: var(--gap);");
}

/// Example 4: object-literal css prop
#[test]
fn test_completion_on_css_prop_line() {
    let insertion = resolve_insertion(
        "--gap",
        Position::new(0, 18),
        Range::new(Position::new(0, 17), Position::new(0, 18)),
        "<div css={{ gap: -",
        true,
    );

    assert_eq!(insertion.rule, InsertionRule::QuotedVarCall);
    assert_eq!(insertion.text, "'var(--gap)'");
}

#[test]
fn test_completion_rule_cascade() {
    let cursor = Position::new(0, 0);
    let range = Range::new(cursor, cursor);

    assert_eq!(
        resolve_insertion("--gap", cursor, range, "", false).text,
        "var(--gap)"
    );
    assert_eq!(
        resolve_insertion("--gap", cursor, range, "margin: var(--a) ", false).rule,
        InsertionRule::BareName
    );
    // `var(` beats the css prop marker
    assert_eq!(
        resolve_insertion("--gap", cursor, range, "<a css={{ m: 'var(--x)', p: ", true).rule,
        InsertionRule::BareName
    );
}

/// Examples 5 and 6: hover content
#[test]
fn test_hover_payloads() {
    let color = build_hover_payload("#336699", true);
    assert!(color.starts_with("![](data:image/svg+xml;base64,"));
    assert!(color.ends_with(')'));

    assert_eq!(build_hover_payload("8px", true), "8px");
}

#[test]
fn test_lookup_by_name_zero_one_many() {
    let sources = vec![
        SourceText::new(uri("a.globals.ts"), "css`\n    --gap: 8px;\n    --pad: 2px;\n`"),
        SourceText::new(uri("b.globals.ts"), "css`\n    --gap: 12px;\n`"),
    ];
    let index = VariableLookupIndex::resolve(None, &sources);

    assert!(lookup_declarations_by_name("--missing", index.declarations()).is_empty());
    assert_eq!(lookup_declarations_by_name("--pad", index.declarations()).len(), 1);

    let gaps = lookup_declarations_by_name("--gap", index.declarations());
    assert_eq!(gaps.len(), 2);
    assert_eq!(gaps[0].value, "8px");
    assert_eq!(gaps[1].value, "12px");
    assert_eq!(gaps[1].uri, uri("b.globals.ts"));
}

#[test]
fn test_active_document_has_priority() {
    let sources = vec![SourceText::new(
        uri("theme.globals.ts"),
        "css`\n    --gap: 8px;\n    --radius: 4px;\n`",
    )];
    let app = uri("app.tsx");
    let app_text = "const local = css`\n    --gap: 2px;\n`;\nconst Box = styled.div`\n  padding: var(--gap);\n`;";

    let index = VariableLookupIndex::resolve(Some((&app, app_text)), &sources);

    assert_eq!(index.first_by_name("--gap").unwrap().value, "2px");
    assert_eq!(index.first_by_name("--gap").unwrap().uri, app);
    assert_eq!(index.unique().len(), 2);

    let name = variable_at_position(app_text, Position::new(4, 17)).unwrap();
    assert_eq!(name, "--gap");
}

#[test]
fn test_active_document_replaces_its_own_stale_source() {
    let globals = uri("theme.globals.ts");
    let sources = vec![SourceText::new(globals.clone(), "css`\n    --gap: 8px;\n`")];

    let index = VariableLookupIndex::resolve(Some((&globals, "css`\n    --gap: 10px;\n`")), &sources);

    assert_eq!(index.len(), 1);
    assert_eq!(index.declarations()[0].value, "10px");
}

/// Integration test: manager lifecycle as driven by the server
#[tokio::test]
async fn test_manager_workflow() {
    let manager = VariableManager::new(Config::default());
    let theme = uri("theme.globals.ts");
    let tokens = uri("tokens.globals.js");

    manager
        .set_sources(vec![
            SourceText::new(theme.clone(), GLOBALS),
            SourceText::new(tokens.clone(), "export default css`\n    --brand: tomato;\n`;"),
        ])
        .await;
    assert_eq!(manager.source_count().await, 2);

    let index = manager.resolve(None).await;
    assert_eq!(index.unique().len(), 6);
    assert_eq!(index.first_by_name("--brand").unwrap().uri, tokens);

    // Edit one source
    assert!(
        manager
            .update_source_if_known(&tokens, "export default css`\n    --brand: navy;\n`;")
            .await
    );
    let index = manager.resolve(None).await;
    assert_eq!(index.first_by_name("--brand").unwrap().value, "navy");

    // Delete it
    manager.remove_source(&tokens).await;
    let index = manager.resolve(None).await;
    assert!(index.first_by_name("--brand").is_none());
    assert!(index.first_by_name("--gap").is_some());

    // Completion list for an active document
    let app = uri("app.tsx");
    let app_text = "const Box = styled.div`\n  gap: var(--";
    let index = manager.resolve(Some((&app, app_text))).await;
    let context = CompletionRequestContext::from_document(app_text, Position::new(1, 13)).unwrap();
    let labels: Vec<_> = index
        .unique()
        .into_iter()
        .map(|decl| build_completion_payload(decl, &context, false))
        .map(|payload| (payload.label, payload.insert_text))
        .collect();

    assert_eq!(labels[0], ("--primary-color".to_string(), "primary-color)".to_string()));
    assert_eq!(labels.len(), 5);
}
