//! Datasets and the per-session dataset registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record. Key order is preserved, so the first row defines column order.
pub type Row = serde_json::Map<String, Value>;

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    File,
    Catalog,
}

impl DatasetSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetSource::File => "file",
            DatasetSource::Catalog => "catalog",
        }
    }
}

/// Immutable snapshot of tabular rows.
///
/// `columns` and `row_count` are derived on construction and cannot drift
/// from `rows`; a transform builds a new `Dataset` instead of editing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    id: String,
    name: String,
    source: DatasetSource,
    rows: Vec<Row>,
    columns: Vec<String>,
    #[serde(rename = "rowCount")]
    row_count: usize,
}

impl Dataset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source: DatasetSource,
        rows: Vec<Row>,
    ) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        let row_count = rows.len();
        Self {
            id: id.into(),
            name: name.into(),
            source,
            rows,
            columns,
            row_count,
        }
    }

    /// Same identity, new rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self::new(self.id.clone(), self.name.clone(), self.source, rows)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> DatasetSource {
        self.source
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Column existence check that fails with the list of real columns.
    pub fn require_column(&self, column: &str) -> Result<(), DataError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(DataError::ColumnNotFound {
                column: column.to_string(),
                available: self.columns.join(", "),
            })
        }
    }
}

/// Stable classification of hard failures, suitable for the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DatasetNotFound,
    ColumnNotFound,
    CapacityExceeded,
    EmptyResult,
    InvalidParams,
    Internal,
}

/// Hard failures: the target is missing or invalid and the tool call aborts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("Dataset not found: {reference}")]
    DatasetNotFound { reference: String },

    #[error("Column {column} not found. Columns: {available}")]
    ColumnNotFound { column: String, available: String },

    #[error("Maximum number of datasets reached ({max}). Remove one before loading another.")]
    CapacityExceeded { max: usize },

    #[error("The query for {dataset_id} returned no rows. Check the filters.")]
    EmptyResult { dataset_id: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },
}

impl DataError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DataError::DatasetNotFound { .. } => FailureKind::DatasetNotFound,
            DataError::ColumnNotFound { .. } => FailureKind::ColumnNotFound,
            DataError::CapacityExceeded { .. } => FailureKind::CapacityExceeded,
            DataError::EmptyResult { .. } => FailureKind::EmptyResult,
            DataError::InvalidParams { .. } => FailureKind::InvalidParams,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DataError::InvalidParams {
            message: message.into(),
        }
    }
}

/// Default number of datasets a session may hold.
pub const MAX_DATASETS: usize = 3;

/// Bounded, insertion-ordered set of loaded datasets.
///
/// The last entry is the most recently added one, which is what lookups fall
/// back to when a reference matches nothing.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    datasets: Vec<Dataset>,
    max_datasets: usize,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_DATASETS)
    }

    pub fn with_capacity(max_datasets: usize) -> Self {
        Self {
            datasets: Vec::new(),
            max_datasets,
        }
    }

    pub fn max_datasets(&self) -> usize {
        self.max_datasets
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.datasets.len() >= self.max_datasets
    }

    /// Datasets in insertion order.
    pub fn list(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn latest(&self) -> Option<&Dataset> {
        self.datasets.last()
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    /// Fail with `CapacityExceeded` if another dataset would not fit.
    pub fn ensure_capacity(&self) -> Result<(), DataError> {
        if self.is_full() {
            Err(DataError::CapacityExceeded {
                max: self.max_datasets,
            })
        } else {
            Ok(())
        }
    }

    /// Register a dataset as the most recent one.
    ///
    /// Re-adding an id that is already loaded refreshes that entry and moves
    /// it to the end; it does not count against capacity.
    pub fn add(&mut self, dataset: Dataset) -> Result<&Dataset, DataError> {
        if let Some(pos) = self.position(&dataset.id) {
            self.datasets.remove(pos);
        } else {
            self.ensure_capacity()?;
        }
        tracing::debug!(dataset_id = %dataset.id, rows = dataset.row_count, "dataset registered");
        let pos = self.datasets.len();
        self.datasets.push(dataset);
        Ok(&self.datasets[pos])
    }

    /// Drop a dataset by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Dataset> {
        let pos = self.position(id)?;
        tracing::debug!(dataset_id = %id, "dataset removed");
        Some(self.datasets.remove(pos))
    }

    /// Swap in a new version of a dataset, keeping its position.
    pub fn replace(&mut self, id: &str, dataset: Dataset) {
        match self.position(id) {
            Some(pos) => self.datasets[pos] = dataset,
            None => tracing::warn!(dataset_id = %id, "replace of unknown dataset ignored"),
        }
    }

    /// Canonical lookup: exact id, then exact name, then the most recent dataset.
    ///
    /// Only fails when the registry is empty.
    pub fn resolve(&self, reference: &str) -> Result<&Dataset, DataError> {
        self.resolve_index(reference).map(|pos| &self.datasets[pos])
    }

    /// Position-returning variant of [`resolve`](Self::resolve).
    pub fn resolve_index(&self, reference: &str) -> Result<usize, DataError> {
        if let Some(pos) = self.position(reference) {
            return Ok(pos);
        }
        if let Some(pos) = self.datasets.iter().position(|d| d.name == reference) {
            return Ok(pos);
        }
        if self.datasets.is_empty() {
            return Err(DataError::DatasetNotFound {
                reference: reference.to_string(),
            });
        }
        tracing::debug!(reference, "no exact match, falling back to latest dataset");
        Ok(self.datasets.len() - 1)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.datasets.iter().position(|d| d.id == id)
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn dataset(id: &str) -> Dataset {
        Dataset::new(
            id,
            format!("{id} name"),
            DatasetSource::File,
            vec![row(json!({"a": 1, "b": "x"}))],
        )
    }

    #[test]
    fn test_columns_follow_first_row() {
        let ds = Dataset::new(
            "d",
            "d",
            DatasetSource::File,
            vec![row(json!({"z": 1, "a": 2})), row(json!({"q": 3}))],
        );
        assert_eq!(ds.columns(), &["z".to_string(), "a".to_string()]);
        assert_eq!(ds.row_count(), 2);

        let empty = ds.with_rows(Vec::new());
        assert!(empty.columns().is_empty());
        assert_eq!(empty.row_count(), 0);
        assert_eq!(empty.id(), "d");
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut registry = DatasetRegistry::with_capacity(2);
        registry.add(dataset("a")).unwrap();
        registry.add(dataset("b")).unwrap();

        let err = registry.add(dataset("c")).unwrap_err();
        assert_eq!(err, DataError::CapacityExceeded { max: 2 });
        assert_eq!(registry.len(), 2);
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_readding_same_id_moves_to_latest() {
        let mut registry = DatasetRegistry::with_capacity(2);
        registry.add(dataset("a")).unwrap();
        registry.add(dataset("b")).unwrap();
        registry.add(dataset("a")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.latest().unwrap().id(), "a");
    }

    #[test]
    fn test_resolve_order() {
        let mut registry = DatasetRegistry::new();
        registry.add(dataset("first")).unwrap();
        registry.add(dataset("second")).unwrap();

        assert_eq!(registry.resolve("first").unwrap().id(), "first");
        assert_eq!(registry.resolve("first name").unwrap().id(), "first");
        assert_eq!(registry.resolve("typo").unwrap().id(), "second");
    }

    #[test]
    fn test_resolve_empty_registry_fails() {
        let registry = DatasetRegistry::new();
        let err = registry.resolve("anything").unwrap_err();
        assert_eq!(err.kind(), FailureKind::DatasetNotFound);
    }

    #[test]
    fn test_remove_and_replace() {
        let mut registry = DatasetRegistry::new();
        registry.add(dataset("a")).unwrap();
        registry.add(dataset("b")).unwrap();

        assert!(registry.remove("missing").is_none());
        assert_eq!(registry.len(), 2);

        let replacement = registry.get("a").unwrap().with_rows(Vec::new());
        registry.replace("a", replacement);
        assert_eq!(registry.list()[0].row_count(), 0);
        assert_eq!(registry.latest().unwrap().id(), "b");

        registry.remove("a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_require_column_lists_available() {
        let ds = dataset("a");
        let err = ds.require_column("nope").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ColumnNotFound);
        assert!(err.to_string().contains("a, b"));
    }
}
