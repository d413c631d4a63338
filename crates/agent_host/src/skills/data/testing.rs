//! Canned catalog shared by the skill tests.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use services::catalog::{
    CatalogClient, CatalogEntry, CatalogQuery, ColumnMetadata, DatasetMetadata,
};
use shared::dataset::Row;

/// Answers every call from memory and records what it was asked.
#[derive(Default)]
pub(crate) struct CannedCatalog {
    pub rows: Vec<Row>,
    pub entries: Vec<CatalogEntry>,
    pub fetches: Mutex<Vec<CatalogQuery>>,
    pub searches: Mutex<Vec<String>>,
}

impl CannedCatalog {
    pub fn with_rows(values: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            rows: values
                .into_iter()
                .map(|v| v.as_object().cloned().unwrap())
                .collect(),
            ..Default::default()
        })
    }

    pub fn with_entries(entries: Vec<CatalogEntry>) -> Arc<Self> {
        Arc::new(Self {
            entries,
            ..Default::default()
        })
    }

    pub fn entry(id: &str, name: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            updated_at: None,
            columns: vec!["municipio".to_string(), "total".to_string()],
            link: None,
        }
    }
}

#[async_trait]
impl CatalogClient for CannedCatalog {
    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<Row>> {
        self.fetches.lock().push(query.clone());
        Ok(self.rows.clone())
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>> {
        self.searches.lock().push(query.to_string());
        let needle = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn metadata(&self, dataset_id: &str) -> Result<DatasetMetadata> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == dataset_id)
            .ok_or_else(|| anyhow!("Catalog API error: 404 Not Found - {dataset_id}"))?;
        Ok(DatasetMetadata {
            id: entry.id.clone(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            category: None,
            rows_updated_at: None,
            columns: entry
                .columns
                .iter()
                .map(|field| ColumnMetadata {
                    name: field.clone(),
                    field_name: field.clone(),
                    data_type_name: Some("text".to_string()),
                    description: None,
                })
                .collect(),
        })
    }
}
