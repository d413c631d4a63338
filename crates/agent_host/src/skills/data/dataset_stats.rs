//! Column statistics skill for Analysis mode.
//!
//! Scans every cell once and reports, per column, how many cells are null,
//! how many are blank, which kind the remaining cells are, and how many
//! distinct raw values the column holds. No sampling: datasets are capped in
//! size, so the answer is exact.

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use shared::cell::{Cell, CellKind};
use shared::dataset::Dataset;
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

/// Column type as reported to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    Null,
    Empty,
    Text,
    Numeric,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    #[serde(skip)]
    pub name: String,
    pub nulls: usize,
    pub empty: usize,
    pub non_missing: usize,
    pub inferred_type: InferredType,
    pub unique_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    #[serde(serialize_with = "columns_by_name")]
    pub columns: Vec<ColumnStats>,
}

impl DatasetStats {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn columns_by_name<S: Serializer>(columns: &[ColumnStats], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(columns.iter().map(|c| (c.name.as_str(), c)))
}

/// Distinct-value key over raw cells. Absent, null, `""`, `"10"` and `10`
/// are all different values.
#[derive(Debug, PartialEq, Eq, Hash)]
enum RawKey {
    Absent,
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}

impl RawKey {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None => RawKey::Absent,
            Some(Value::Null) => RawKey::Null,
            Some(Value::Bool(b)) => RawKey::Bool(*b),
            Some(Value::Number(n)) => match n.as_f64() {
                // +0 and -0 are the same value
                Some(f) => RawKey::Number(if f == 0.0 { 0 } else { f.to_bits() }),
                None => RawKey::Text(n.to_string()),
            },
            Some(Value::String(s)) => RawKey::Text(s.clone()),
            Some(other) => RawKey::Text(other.to_string()),
        }
    }
}

/// Per-column statistics over the whole dataset.
pub fn compute_stats(dataset: &Dataset) -> DatasetStats {
    let columns = dataset
        .columns()
        .iter()
        .map(|column| column_stats(dataset, column))
        .collect();
    DatasetStats { columns }
}

fn column_stats(dataset: &Dataset, column: &str) -> ColumnStats {
    let mut nulls = 0;
    let mut empty = 0;
    let mut kinds = BTreeSet::new();
    let mut distinct = HashSet::new();

    for row in dataset.rows() {
        let raw = row.get(column);
        distinct.insert(RawKey::of(raw));
        match Cell::classify(raw) {
            Cell::Null => nulls += 1,
            Cell::Empty => empty += 1,
            cell => {
                kinds.insert(cell.kind());
            }
        }
    }

    let non_missing = dataset.row_count() - nulls - empty;
    let inferred_type = match (kinds.len(), kinds.iter().next()) {
        (1, Some(CellKind::Numeric)) => InferredType::Numeric,
        (1, Some(_)) => InferredType::Text,
        (0, _) if nulls > 0 && empty == 0 => InferredType::Null,
        (0, _) if empty > 0 && nulls == 0 => InferredType::Empty,
        _ => InferredType::Mixed,
    };

    ColumnStats {
        name: column.to_string(),
        nulls,
        empty,
        non_missing,
        inferred_type,
        unique_count: distinct.len(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatsParams {
    #[serde(default)]
    dataset_id: String,
}

/// Column statistics skill.
pub struct DatasetStatsSkill;

impl DatasetStatsSkill {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DatasetStatsSkill {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for DatasetStatsSkill {
    fn id(&self) -> &'static str {
        "get_dataset_stats"
    }

    fn name(&self) -> &'static str {
        "Dataset Statistics"
    }

    fn description(&self) -> &'static str {
        "Count nulls, blanks and distinct values and infer the type of every column of a dataset"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        &[Mode::Analysis, Mode::Cleaning]
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let params: StatsParams = input.parse()?;
        let registry = ctx.datasets.read();

        // No datasets at all is something the agent can fix by loading one
        let dataset = match registry.resolve(&params.dataset_id) {
            Ok(dataset) => dataset,
            Err(_) => {
                let available: Vec<&str> = registry.list().iter().map(|d| d.id()).collect();
                return Ok(SkillOutput::soft_error(format!(
                    "Dataset not found: {}. Available datasets: {}",
                    params.dataset_id,
                    available.join(", ")
                )));
            }
        };

        let stats = compute_stats(dataset);
        tracing::debug!(dataset_id = dataset.id(), columns = stats.columns.len(), "stats computed");

        Ok(SkillOutput::data(serde_json::to_value(&stats)?)
            .with_text(format!("Computing statistics for {}", dataset.name())))
    }
}
