//! Catalog discovery skills: keyword search and per-dataset metadata.
//!
//! Neither touches the registry. They let the agent find an id and check its
//! columns before committing a slot to `fetch_dataset`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use services::catalog::CatalogClient;
use shared::dataset::DataError;
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(alias = "q")]
    query: String,
}

pub struct CatalogSearch {
    client: Arc<dyn CatalogClient>,
}

impl CatalogSearch {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Skill for CatalogSearch {
    fn id(&self) -> &'static str {
        "search_catalog"
    }

    fn name(&self) -> &'static str {
        "Catalog Search"
    }

    fn description(&self) -> &'static str {
        "Search the open-data catalog by keywords; returns dataset ids, names, descriptions and column names"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Sensitive
    }

    fn modes(&self) -> &'static [Mode] {
        Mode::all()
    }

    async fn execute(&self, input: SkillInput, _ctx: &SkillContext) -> Result<SkillOutput> {
        let params: SearchParams = input.parse()?;
        let query = params.query.trim();
        if query.is_empty() {
            return Err(DataError::invalid("query is required").into());
        }

        let entries = self.client.search(query).await?;
        tracing::debug!(query, results = entries.len(), "catalog search");

        Ok(SkillOutput::data(serde_json::to_value(&entries)?)
            .with_text(format!("Searching catalog: \"{query}\"")))
    }
}

#[derive(Debug, Deserialize)]
struct MetadataParams {
    #[serde(alias = "id")]
    dataset_id: String,
}

pub struct CatalogMetadata {
    client: Arc<dyn CatalogClient>,
}

impl CatalogMetadata {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Skill for CatalogMetadata {
    fn id(&self) -> &'static str {
        "get_dataset_metadata"
    }

    fn name(&self) -> &'static str {
        "Catalog Metadata"
    }

    fn description(&self) -> &'static str {
        "Describe a catalog dataset by id: name, description, category, last update and column types"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Sensitive
    }

    fn modes(&self) -> &'static [Mode] {
        Mode::all()
    }

    async fn execute(&self, input: SkillInput, _ctx: &SkillContext) -> Result<SkillOutput> {
        let params: MetadataParams = input.parse()?;
        let id = params.dataset_id.trim();
        if id.is_empty() {
            return Err(DataError::invalid("dataset_id is required").into());
        }

        let metadata = self.client.metadata(id).await?;
        Ok(SkillOutput::data(serde_json::to_value(&metadata)?)
            .with_text(format!("Fetching metadata for {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::dataset::FailureKind;
    use shared::settings::AnalysisSettings;

    use crate::skills::data::testing::CannedCatalog;

    fn context() -> SkillContext {
        SkillContext::new(Mode::Analysis, AnalysisSettings::default())
    }

    fn kind(err: &anyhow::Error) -> Option<FailureKind> {
        err.downcast_ref::<DataError>().map(DataError::kind)
    }

    fn catalog() -> Arc<CannedCatalog> {
        CannedCatalog::with_entries(vec![
            CannedCatalog::entry("abcd-1234", "Casos de dengue"),
            CannedCatalog::entry("wxyz-9876", "Presupuesto municipal"),
        ])
    }

    #[tokio::test]
    async fn test_search_returns_matching_entries() {
        let catalog = catalog();
        let skill = CatalogSearch::new(catalog.clone());
        let ctx = context();

        let input = SkillInput::new().with_param("q", json!("  dengue "));
        let output = skill.execute(input, &ctx).await.unwrap();

        let data = output.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["id"], "abcd-1234");
        assert_eq!(data[0]["columns"], json!(["municipio", "total"]));
        assert_eq!(output.text.as_deref(), Some("Searching catalog: \"dengue\""));
        assert_eq!(*catalog.searches.lock(), vec!["dengue".to_string()]);
        assert!(ctx.datasets.read().is_empty());
    }

    #[tokio::test]
    async fn test_search_with_no_hits_is_empty_list() {
        let skill = CatalogSearch::new(catalog());
        let input = SkillInput::new().with_param("query", json!("clima"));
        let output = skill.execute(input, &context()).await.unwrap();
        assert_eq!(output.data.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_blank_search_is_invalid() {
        let catalog = catalog();
        let skill = CatalogSearch::new(catalog.clone());

        let input = SkillInput::new().with_param("query", json!("   "));
        let err = skill.execute(input, &context()).await.unwrap_err();
        assert_eq!(kind(&err), Some(FailureKind::InvalidParams));
        assert!(catalog.searches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_describes_columns() {
        let skill = CatalogMetadata::new(catalog());

        let input = SkillInput::new().with_param("id", json!("wxyz-9876"));
        let output = skill.execute(input, &context()).await.unwrap();

        let data = output.data.unwrap();
        assert_eq!(data["name"], "Presupuesto municipal");
        assert_eq!(data["columns"][1]["fieldName"], "total");
        assert_eq!(output.text.as_deref(), Some("Fetching metadata for wxyz-9876"));
    }

    #[tokio::test]
    async fn test_metadata_errors() {
        let skill = CatalogMetadata::new(catalog());

        let err = skill.execute(SkillInput::new(), &context()).await.unwrap_err();
        assert_eq!(kind(&err), Some(FailureKind::InvalidParams));

        let input = SkillInput::new().with_param("dataset_id", json!("nope-0000"));
        let err = skill.execute(input, &context()).await.unwrap_err();
        assert_eq!(kind(&err), None);
        assert!(err.to_string().contains("404"));
    }
}
