//! Cleaning skill for Cleaning mode.
//!
//! Applies a missing-value transform to the target columns and swaps the
//! result into the registry under the same id. "Missing" always means
//! [`shared::cell::is_missing`]: null, absent, or blank after trimming.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::cell::{self, Cell};
use shared::dataset::{DataError, Dataset, DatasetRegistry, Row};
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanAction {
    /// Drop rows with a missing value in any target column
    DropNa,
    /// Fill with the column mean, rounded to 2 decimals
    FillMean,
    FillZero,
    /// Fill with a caller-provided value
    FillValue,
}

impl CleanAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "drop_na" => Some(CleanAction::DropNa),
            "fill_mean" => Some(CleanAction::FillMean),
            "fill_zero" => Some(CleanAction::FillZero),
            "fill_value" => Some(CleanAction::FillValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanAction::DropNa => "drop_na",
            CleanAction::FillMean => "fill_mean",
            CleanAction::FillZero => "fill_zero",
            CleanAction::FillValue => "fill_value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanSummary {
    pub status: &'static str,
    pub initial_rows: usize,
    pub final_rows: usize,
    pub action: CleanAction,
}

/// Produce the cleaned rows without touching the input dataset.
pub fn clean_rows(
    dataset: &Dataset,
    action: CleanAction,
    targets: &[String],
    fill_value: &Value,
) -> Vec<Row> {
    let mut rows = dataset.rows().to_vec();

    match action {
        CleanAction::DropNa => {
            rows.retain(|row| targets.iter().all(|col| !cell::is_missing(row.get(col))));
        }
        CleanAction::FillMean => {
            for col in targets {
                let mean = round2(column_mean(&rows, col));
                fill_missing(&mut rows, col, &cell::number_value(mean));
            }
        }
        CleanAction::FillZero => {
            for col in targets {
                fill_missing(&mut rows, col, &Value::from(0));
            }
        }
        CleanAction::FillValue => {
            for col in targets {
                fill_missing(&mut rows, col, fill_value);
            }
        }
    }

    rows
}

/// Mean of the numeric cells of a column, 0 when there are none.
fn column_mean(rows: &[Row], column: &str) -> f64 {
    let (sum, count) = rows
        .iter()
        .filter_map(|row| Cell::classify(row.get(column)).as_number())
        .fold((0.0, 0usize), |(sum, count), n| (sum + n, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

fn fill_missing(rows: &mut [Row], column: &str, value: &Value) {
    for row in rows.iter_mut() {
        if cell::is_missing(row.get(column)) {
            row.insert(column.to_string(), value.clone());
        }
    }
}

/// Clean a dataset in place in the registry.
///
/// The reference resolves like every other lookup (id, name, latest), so
/// this only fails when no dataset is loaded at all.
pub fn clean(
    registry: &mut DatasetRegistry,
    reference: &str,
    action: CleanAction,
    columns: Option<&[String]>,
    fill_value: &Value,
) -> Result<CleanSummary, DataError> {
    let pos = registry.resolve_index(reference)?;
    let dataset = &registry.list()[pos];

    let targets: Vec<String> = match columns {
        Some(cols) if !cols.is_empty() => cols.to_vec(),
        _ => dataset.columns().to_vec(),
    };
    for col in targets.iter().filter(|c| !dataset.has_column(c)) {
        tracing::warn!(dataset_id = dataset.id(), column = %col, "cleaning a column the dataset does not have");
    }

    let rows = clean_rows(dataset, action, &targets, fill_value);
    let cleaned = dataset.with_rows(rows);
    let summary = CleanSummary {
        status: "success",
        initial_rows: dataset.row_count(),
        final_rows: cleaned.row_count(),
        action,
    };

    let id = dataset.id().to_string();
    tracing::info!(
        dataset_id = %id,
        action = action.as_str(),
        initial_rows = summary.initial_rows,
        final_rows = summary.final_rows,
        "dataset cleaned"
    );
    registry.replace(&id, cleaned);
    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct CleanParams {
    #[serde(default)]
    dataset_id: String,
    action: String,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default, alias = "fillValue")]
    fill_value: Option<Value>,
}

/// Missing-value cleaning skill.
pub struct DatasetCleaner;

impl DatasetCleaner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DatasetCleaner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for DatasetCleaner {
    fn id(&self) -> &'static str {
        "clean_dataset"
    }

    fn name(&self) -> &'static str {
        "Dataset Cleaner"
    }

    fn description(&self) -> &'static str {
        "Handle missing values: drop_na, fill_mean, fill_zero or fill_value on some or all columns"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        &[Mode::Cleaning]
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let params: CleanParams = input.parse()?;
        let Some(action) = CleanAction::parse(&params.action) else {
            return Ok(SkillOutput::soft_error("unsupported cleaning action"));
        };

        // "" and null both mean "no value given"
        let fill_value = match params.fill_value {
            Some(Value::Null) | None => Value::from(ctx.settings.default_fill_value.clone()),
            Some(Value::String(s)) if s.is_empty() => {
                Value::from(ctx.settings.default_fill_value.clone())
            }
            Some(value) => value,
        };

        let mut registry = ctx.datasets.write();
        let name = registry.resolve(&params.dataset_id)?.name().to_string();
        let summary = clean(
            &mut registry,
            &params.dataset_id,
            action,
            params.columns.as_deref(),
            &fill_value,
        )?;

        Ok(SkillOutput::data(serde_json::to_value(&summary)?)
            .with_text(format!("Cleaning data ({}) in {}", action.as_str(), name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::dataset::{DatasetSource, FailureKind};
    use shared::settings::AnalysisSettings;
    use shared::skill::ResultType;

    fn dataset(id: &str, values: Vec<Value>) -> Dataset {
        let rows = values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Dataset::new(id, id, DatasetSource::File, rows)
    }

    fn registry_with(ds: Dataset) -> DatasetRegistry {
        let mut registry = DatasetRegistry::new();
        registry.add(ds).unwrap();
        registry
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_drop_na_on_target_columns() {
        let mut registry = registry_with(dataset(
            "d",
            vec![
                json!({"a": 1, "b": null}),
                json!({"a": " ", "b": 2}),
                json!({"a": 3, "b": 4}),
            ],
        ));

        let summary = clean(&mut registry, "d", CleanAction::DropNa, Some(&cols(&["a"])), &Value::Null)
            .unwrap();
        assert_eq!(summary.initial_rows, 3);
        assert_eq!(summary.final_rows, 2);
        assert_eq!(registry.get("d").unwrap().row_count(), 2);

        clean(&mut registry, "d", CleanAction::DropNa, None, &Value::Null).unwrap();
        assert_eq!(registry.get("d").unwrap().row_count(), 1);
    }

    #[test]
    fn test_fill_mean_rounds_and_skips_text() {
        let ds = dataset(
            "d",
            vec![
                json!({"v": "1"}),
                json!({"v": 2}),
                json!({"v": "2"}),
                json!({"v": null}),
                json!({"v": "n/a"}),
            ],
        );
        let rows = clean_rows(&ds, CleanAction::FillMean, &cols(&["v"]), &Value::Null);

        assert_eq!(rows[3]["v"], json!(1.67));
        assert_eq!(rows[4]["v"], json!("n/a"));
        assert_eq!(rows[0]["v"], json!("1"));
    }

    #[test]
    fn test_fill_mean_without_numbers_writes_zero() {
        let ds = dataset("d", vec![json!({"v": "x"}), json!({"v": ""})]);
        let rows = clean_rows(&ds, CleanAction::FillMean, &cols(&["v"]), &Value::Null);
        assert_eq!(rows[1]["v"], json!(0));
    }

    #[test]
    fn test_fill_zero_keeps_row_count() {
        let ds = dataset("d", vec![json!({"a": null, "b": ""}), json!({"a": 5, "b": "x"})]);
        let rows = clean_rows(&ds, CleanAction::FillZero, &ds.columns().to_vec(), &Value::Null);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], json!(0));
        assert_eq!(rows[0]["b"], json!(0));
        assert_eq!(rows[1]["b"], json!("x"));
    }

    #[test]
    fn test_unknown_reference_falls_back_to_latest() {
        let mut registry = registry_with(dataset("d", vec![json!({"a": null})]));
        let summary =
            clean(&mut registry, "typo", CleanAction::FillZero, None, &Value::Null).unwrap();
        assert_eq!(summary.final_rows, 1);
        assert_eq!(registry.get("d").unwrap().rows()[0]["a"], json!(0));
    }

    #[test]
    fn test_empty_registry_fails() {
        let mut registry = DatasetRegistry::new();
        let err = clean(&mut registry, "d", CleanAction::DropNa, None, &Value::Null).unwrap_err();
        assert_eq!(err.kind(), FailureKind::DatasetNotFound);
    }

    #[test]
    fn test_drop_everything_clears_columns() {
        let mut registry = registry_with(dataset("d", vec![json!({"a": null})]));
        clean(&mut registry, "d", CleanAction::DropNa, None, &Value::Null).unwrap();

        let ds = registry.get("d").unwrap();
        assert_eq!(ds.row_count(), 0);
        assert!(ds.columns().is_empty());
    }

    #[tokio::test]
    async fn test_fill_value_scenario() {
        let ctx = SkillContext::new(Mode::Cleaning, AnalysisSettings::default());
        ctx.datasets
            .write()
            .add(dataset(
                "sales",
                vec![
                    json!({"city": "X", "amt": "10"}),
                    json!({"city": null, "amt": "20"}),
                    json!({"city": "X", "amt": "5"}),
                ],
            ))
            .unwrap();

        let input = SkillInput::new()
            .with_param("dataset_id", json!("sales"))
            .with_param("action", json!("fill_value"))
            .with_param("columns", json!(["city"]))
            .with_param("fill_value", json!("Unknown"));
        let output = DatasetCleaner::new().execute(input, &ctx).await.unwrap();

        let data = output.data.unwrap();
        assert_eq!(data["finalRows"], 3);
        assert_eq!(data["status"], "success");
        let registry = ctx.datasets.read();
        assert_eq!(registry.get("sales").unwrap().rows()[1]["city"], json!("Unknown"));
    }

    #[tokio::test]
    async fn test_fill_value_default() {
        let ctx = SkillContext::new(Mode::Cleaning, AnalysisSettings::default());
        ctx.datasets
            .write()
            .add(dataset("d", vec![json!({"c": ""})]))
            .unwrap();

        let input = SkillInput::new().with_param("action", json!("fill_value"));
        DatasetCleaner::new().execute(input, &ctx).await.unwrap();

        let registry = ctx.datasets.read();
        assert_eq!(registry.get("d").unwrap().rows()[0]["c"], json!("Desconocido"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_soft_error() {
        let ctx = SkillContext::new(Mode::Cleaning, AnalysisSettings::default());
        ctx.datasets
            .write()
            .add(dataset("d", vec![json!({"c": ""})]))
            .unwrap();

        let input = SkillInput::new().with_param("action", json!("dedupe"));
        let output = DatasetCleaner::new().execute(input, &ctx).await.unwrap();
        assert_eq!(output.result_type, ResultType::Error);
        assert_eq!(ctx.datasets.read().get("d").unwrap().rows()[0]["c"], json!(""));
    }
}
