//! Data skills: one per engine operation.
//!
//! - Registry housekeeping (list, remove)
//! - Catalog search, metadata and download
//! - Column statistics and single-column analysis
//! - Sort/limit/project queries
//! - Missing-value cleaning
//! - Chart resolution

pub mod catalog_fetch;
pub mod catalog_search;
pub mod chart_resolver;
pub mod column_analyzer;
pub mod dataset_cleaner;
pub mod dataset_list;
pub mod dataset_query;
pub mod dataset_stats;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog_fetch::CatalogFetch;
pub use catalog_search::{CatalogMetadata, CatalogSearch};
pub use chart_resolver::ChartResolver;
pub use column_analyzer::ColumnAnalyzer;
pub use dataset_cleaner::DatasetCleaner;
pub use dataset_list::{ListDatasets, RemoveDataset};
pub use dataset_query::DatasetQuery;
pub use dataset_stats::DatasetStatsSkill;

use std::sync::Arc;

use services::catalog::CatalogClient;

use crate::skills::SkillRegistry;

/// Register every data skill with the registry
pub fn register_skills(registry: &mut SkillRegistry, catalog: Arc<dyn CatalogClient>) {
    registry.register(Arc::new(ListDatasets));
    registry.register(Arc::new(RemoveDataset));
    registry.register(Arc::new(CatalogSearch::new(catalog.clone())));
    registry.register(Arc::new(CatalogMetadata::new(catalog.clone())));
    registry.register(Arc::new(CatalogFetch::new(catalog)));
    registry.register(Arc::new(DatasetStatsSkill::new()));
    registry.register(Arc::new(ColumnAnalyzer::new()));
    registry.register(Arc::new(DatasetQuery::new()));
    registry.register(Arc::new(DatasetCleaner::new()));
    registry.register(Arc::new(ChartResolver::new()));
}
