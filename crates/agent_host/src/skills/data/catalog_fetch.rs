//! Catalog download skill.
//!
//! Pulls records from the open-data catalog and registers them as a new
//! dataset named after the catalog id. Fetching an id that is already
//! loaded replaces it in place of taking a new slot.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use services::catalog::{CatalogClient, CatalogQuery};
use shared::dataset::{DataError, Dataset, DatasetSource};
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

use super::dataset_list::DatasetSummary;

pub struct CatalogFetch {
    client: Arc<dyn CatalogClient>,
}

impl CatalogFetch {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Skill for CatalogFetch {
    fn id(&self) -> &'static str {
        "fetch_dataset"
    }

    fn name(&self) -> &'static str {
        "Catalog Fetch"
    }

    fn description(&self) -> &'static str {
        "Download a dataset from the open-data catalog by id, with optional SoQL where/select/order and a row limit"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Sensitive
    }

    fn modes(&self) -> &'static [Mode] {
        Mode::all()
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let mut query: CatalogQuery = input.parse()?;
        query.dataset_id = query.dataset_id.trim().to_string();
        if query.dataset_id.is_empty() {
            return Err(DataError::invalid("dataset_id is required").into());
        }

        // Fail before spending a download on a full registry
        {
            let registry = ctx.datasets.read();
            if registry.get(&query.dataset_id).is_none() {
                registry.ensure_capacity()?;
            }
        }

        let rows = self.client.fetch(&query).await?;
        if rows.is_empty() {
            return Err(DataError::EmptyResult {
                dataset_id: query.dataset_id,
            }
            .into());
        }

        let dataset = Dataset::new(
            query.dataset_id.clone(),
            query.dataset_id.clone(),
            DatasetSource::Catalog,
            rows,
        );
        let summary = {
            let mut registry = ctx.datasets.write();
            DatasetSummary::from(registry.add(dataset)?)
        };
        tracing::info!(dataset_id = %summary.id, rows = summary.row_count, "catalog dataset registered");

        let text = match query.where_clause.as_deref() {
            Some(clause) => format!("Downloading dataset {} (filter: {})", query.dataset_id, clause),
            None => format!("Downloading dataset {}", query.dataset_id),
        };
        Ok(SkillOutput::data(serde_json::to_value(&summary)?).with_text(text))
    }
}
