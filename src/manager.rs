use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::lsp_types::Url;

use crate::index::VariableLookupIndex;
use crate::types::{Config, SourceText};

/// Holds the discovered declaration sources and the active configuration.
///
/// Only raw texts are stored. Declarations are extracted again on every
/// [`VariableManager::resolve`], so edits never leave stale entries behind.
#[derive(Clone)]
pub struct VariableManager {
    /// Discovered sources in discovery order
    sources: Arc<RwLock<Vec<SourceText>>>,

    /// Configuration
    config: Arc<RwLock<Config>>,
}

impl VariableManager {
    pub fn new(config: Config) -> Self {
        Self {
            sources: Arc::new(RwLock::new(Vec::new())),
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace all sources, e.g. after a workspace scan
    pub async fn set_sources(&self, sources: Vec<SourceText>) {
        let mut stored = self.sources.write().await;
        *stored = sources;
    }

    /// Update a source's text in place, or append it when it is new
    pub async fn upsert_source(&self, uri: Url, text: String) {
        let mut sources = self.sources.write().await;
        match sources.iter_mut().find(|s| s.uri == uri) {
            Some(existing) => existing.text = text,
            None => sources.push(SourceText { uri, text }),
        }
    }

    /// Update a source's text only if it is already known
    pub async fn update_source_if_known(&self, uri: &Url, text: &str) -> bool {
        let mut sources = self.sources.write().await;
        match sources.iter_mut().find(|s| &s.uri == uri) {
            Some(existing) => {
                existing.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub async fn remove_source(&self, uri: &Url) {
        let mut sources = self.sources.write().await;
        sources.retain(|s| &s.uri != uri);
    }

    pub async fn is_source(&self, uri: &Url) -> bool {
        let sources = self.sources.read().await;
        sources.iter().any(|s| &s.uri == uri)
    }

    pub async fn source_count(&self) -> usize {
        self.sources.read().await.len()
    }

    /// Build the lookup index for a request, giving `active` priority
    pub async fn resolve(&self, active: Option<(&Url, &str)>) -> VariableLookupIndex {
        let snapshot = self.sources.read().await.clone();
        VariableLookupIndex::resolve(active, &snapshot)
    }

    /// Get current configuration
    pub async fn get_config(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn set_config(&self, config: Config) {
        let mut stored = self.config.write().await;
        *stored = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///{path}")).unwrap()
    }

    #[tokio::test]
    async fn resolve_reflects_latest_source_text() {
        let manager = VariableManager::new(Config::default());
        let theme = uri("theme.globals.ts");

        manager
            .upsert_source(theme.clone(), "css`--gap: 8px;`".to_string())
            .await;
        assert_eq!(
            manager.resolve(None).await.first_by_name("--gap").unwrap().value,
            "8px"
        );

        manager
            .upsert_source(theme.clone(), "css`--gap: 12px;`".to_string())
            .await;
        let index = manager.resolve(None).await;
        assert_eq!(index.len(), 1);
        assert_eq!(index.first_by_name("--gap").unwrap().value, "12px");
    }

    #[tokio::test]
    async fn sources_keep_discovery_order() {
        let manager = VariableManager::new(Config::default());
        manager
            .set_sources(vec![
                SourceText::new(uri("b.globals.ts"), "css`--x: b;`"),
                SourceText::new(uri("a.globals.ts"), "css`--x: a;`"),
            ])
            .await;
        manager
            .upsert_source(uri("c.globals.ts"), "css`--x: c;`".to_string())
            .await;

        let index = manager.resolve(None).await;
        let values: Vec<_> = index
            .lookup_by_name("--x")
            .iter()
            .map(|d| d.value.clone())
            .collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn update_source_if_known_ignores_other_documents() {
        let manager = VariableManager::new(Config::default());
        let app = uri("app.tsx");

        assert!(!manager.update_source_if_known(&app, "css`--x: 1;`").await);
        assert!(!manager.is_source(&app).await);
        assert_eq!(manager.source_count().await, 0);
    }

    #[tokio::test]
    async fn remove_source_drops_declarations() {
        let manager = VariableManager::new(Config::default());
        let theme = uri("theme.globals.ts");
        manager
            .upsert_source(theme.clone(), "css`--gap: 8px;`".to_string())
            .await;

        manager.remove_source(&theme).await;

        assert!(manager.resolve(None).await.is_empty());
    }

    #[tokio::test]
    async fn active_document_wins_over_sources() {
        let manager = VariableManager::new(Config::default());
        manager
            .upsert_source(uri("theme.globals.ts"), "css`--gap: 8px;`".to_string())
            .await;
        let app = uri("app.tsx");

        let index = manager
            .resolve(Some((&app, "const s = css`--gap: 2px;`")))
            .await;

        assert_eq!(index.first_by_name("--gap").unwrap().value, "2px");
        assert_eq!(index.lookup_by_name("--gap").len(), 2);
    }
}
