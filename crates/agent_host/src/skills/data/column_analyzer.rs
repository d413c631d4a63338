//! Column analysis skill for Analysis mode.
//!
//! Two analyses are supported on a single column:
//! - `frequency`: top categories by count
//! - `numeric_stats`: count/sum/mean/min/max over the numeric cells

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::cell::{self, Cell};
use shared::dataset::{DataError, Dataset};
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnAnalysis {
    Frequency {
        data: Vec<FrequencyEntry>,
        total_categories: usize,
    },
    NumericStats {
        count: usize,
        sum: f64,
        mean: f64,
        min: f64,
        max: f64,
    },
}

/// Either an analysis or a reason the agent should pick another argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Done(ColumnAnalysis),
    SoftError(String),
}

/// Options that shape the frequency table.
#[derive(Debug, Clone)]
pub struct FrequencyOptions<'a> {
    pub top_n: usize,
    pub null_label: &'a str,
}

/// Analyze one column.
///
/// Fails hard only when the column does not exist; an unknown analysis type
/// or a column without numbers comes back as [`Analysis::SoftError`].
pub fn analyze(
    dataset: &Dataset,
    column: &str,
    analysis_type: &str,
    options: &FrequencyOptions<'_>,
) -> Result<Analysis, DataError> {
    dataset.require_column(column)?;

    Ok(match analysis_type {
        "frequency" => Analysis::Done(frequency(dataset, column, options)),
        "numeric_stats" => match numeric_stats(dataset, column) {
            Some(stats) => Analysis::Done(stats),
            None => Analysis::SoftError("no numeric values".to_string()),
        },
        _ => Analysis::SoftError("unsupported analysis type".to_string()),
    })
}

fn frequency(dataset: &Dataset, column: &str, options: &FrequencyOptions<'_>) -> ColumnAnalysis {
    // First-seen order is kept so the stable sort breaks ties by it
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for row in dataset.rows() {
        let key = cell::label(row.get(column)).unwrap_or_else(|| options.null_label.to_string());
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    let total_categories = counts.len();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(options.top_n);

    ColumnAnalysis::Frequency {
        data: counts
            .into_iter()
            .map(|(label, value)| FrequencyEntry { label, value })
            .collect(),
        total_categories,
    }
}

fn numeric_stats(dataset: &Dataset, column: &str) -> Option<ColumnAnalysis> {
    let nums: Vec<f64> = dataset
        .rows()
        .iter()
        .filter_map(|row| Cell::classify(row.get(column)).as_number())
        .collect();

    if nums.is_empty() {
        return None;
    }

    let count = nums.len();
    let sum: f64 = nums.iter().sum();
    let min = nums.iter().copied().fold(f64::INFINITY, f64::min);
    let max = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(ColumnAnalysis::NumericStats {
        count,
        sum,
        mean: sum / count as f64,
        min,
        max,
    })
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    dataset_id: String,
    #[serde(alias = "column")]
    column_name: String,
    #[serde(default = "default_analysis_type", alias = "mode")]
    analysis_type: String,
}

fn default_analysis_type() -> String {
    "frequency".to_string()
}

/// Column analysis skill.
pub struct ColumnAnalyzer;

impl ColumnAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ColumnAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for ColumnAnalyzer {
    fn id(&self) -> &'static str {
        "analyze_column"
    }

    fn name(&self) -> &'static str {
        "Column Analyzer"
    }

    fn description(&self) -> &'static str {
        "Frequency table (analysis_type=frequency) or numeric summary (analysis_type=numeric_stats) of one column"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        &[Mode::Analysis, Mode::Dashboard]
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let params: AnalyzeParams = input.parse()?;
        let registry = ctx.datasets.read();
        let dataset = registry.resolve(&params.dataset_id)?;

        let options = FrequencyOptions {
            top_n: ctx.settings.frequency_top_n,
            null_label: &ctx.settings.null_label,
        };
        let text = format!(
            "Analyzing column '{}' ({})",
            params.column_name, params.analysis_type
        );

        match analyze(dataset, &params.column_name, &params.analysis_type, &options)? {
            Analysis::Done(result) => {
                Ok(SkillOutput::data(serde_json::to_value(&result)?).with_text(text))
            }
            Analysis::SoftError(error) => {
                tracing::debug!(column = %params.column_name, %error, "analysis declined");
                Ok(SkillOutput::soft_error(error).with_text(text))
            }
        }
    }
}
