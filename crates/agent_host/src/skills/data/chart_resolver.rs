//! Chart resolution skill.
//!
//! Agents send chart requests with missing data, misspelled keys or a
//! thousand raw rows for a bar chart. Resolution turns any such request into
//! something plottable, in a fixed order:
//!
//! 1. data fallback to the latest dataset (all rows)
//! 2. emergency aggregation of low-cardinality categorical charts
//! 3. safety cap on the number of points
//! 4. x axis and series key inference from the first row
//! 5. numeric sanitization of the series cells

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::cell::{self, Cell};
use shared::chart::ChartConfig;
use shared::dataset::{DatasetRegistry, Row};
use shared::settings::ChartSettings;
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

const DEFAULT_SERIES_KEY: &str = "count";

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ChartConfig),
    /// Neither the request nor the registry had rows to plot
    NoData,
}

/// Resolve a chart request against the registry. Deterministic: the same
/// request and registry state always produce the same chart.
pub fn resolve_chart(
    mut config: ChartConfig,
    registry: &DatasetRegistry,
    settings: &ChartSettings,
) -> Resolution {
    if config.data.is_empty() {
        if let Some(latest) = registry.latest() {
            tracing::debug!(dataset_id = latest.id(), "chart data taken from latest dataset");
            config.data = latest.rows().to_vec();
        }
    }

    if let Some(aggregated) = aggregate(&config, settings) {
        config.data = aggregated;
    }

    if config.data.len() > settings.max_points {
        tracing::debug!(
            rows = config.data.len(),
            cap = settings.max_points,
            "chart data truncated"
        );
        config.data.truncate(settings.max_points);
    }

    if config.data.is_empty() {
        return Resolution::NoData;
    }

    infer_keys(&mut config);
    sanitize(&mut config.data, &config.series_keys);

    Resolution::Resolved(config)
}

/// Collapse raw rows into a top-N frequency table over the x axis.
///
/// Only bar and pie charts above the row threshold qualify, and only when the
/// x axis repeats enough (distinct keys below `distinct_ratio` of the rows).
/// Rows lacking the x key count as `undefined`, null cells as `null`.
fn aggregate(config: &ChartConfig, settings: &ChartSettings) -> Option<Vec<Row>> {
    let x_key = config.x_axis_key.as_deref().filter(|key| !key.is_empty())?;
    if !config.chart_type.is_categorical() || config.data.len() <= settings.aggregation_min_rows {
        return None;
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in &config.data {
        let key = match row.get(x_key) {
            None => "undefined".to_string(),
            value => cell::label(value).unwrap_or_else(|| "null".to_string()),
        };
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    let rows = config.data.len() as f64;
    if counts.len() as f64 >= rows * settings.distinct_ratio {
        tracing::debug!(distinct = counts.len(), "x axis too diverse to aggregate");
        return None;
    }

    let series_key = config
        .series_keys
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_SERIES_KEY);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(settings.aggregation_top_n);

    tracing::info!(x_axis = x_key, categories = counts.len(), "chart data aggregated");
    Some(
        counts
            .into_iter()
            .map(|(key, count)| {
                let mut row = Row::new();
                row.insert(x_key.to_string(), Value::from(key));
                row.insert(series_key.to_string(), Value::from(count));
                row
            })
            .collect(),
    )
}

/// Fix up the x axis and series keys against the first data row.
fn infer_keys(config: &mut ChartConfig) {
    let Some(first) = config.data.first() else {
        return;
    };

    let x_valid = config
        .x_axis_key
        .as_deref()
        .is_some_and(|key| first.contains_key(key));
    if !x_valid {
        if let Some(key) = first
            .iter()
            .find(|(_, value)| value.is_string())
            .map(|(key, _)| key.clone())
        {
            config.x_axis_key = Some(key);
        }
    }
    let x_key = config.x_axis_key.clone();
    let is_x = |key: &str| x_key.as_deref() == Some(key);

    let series_valid = config.series_keys.iter().any(|key| first.contains_key(key));
    if !series_valid {
        let numeric: Vec<String> = first
            .iter()
            .filter(|(key, value)| !is_x(key.as_str()) && Cell::classify(Some(*value)).as_number().is_some())
            .map(|(key, _)| key.clone())
            .collect();

        config.series_keys = if !numeric.is_empty() {
            numeric
        } else {
            // Whatever comes first that is not the x axis
            first
                .keys()
                .find(|key| !is_x(key.as_str()))
                .or_else(|| first.keys().next())
                .cloned()
                .into_iter()
                .collect()
        };
    }
}

/// Replace numeric-looking series cells with numbers.
fn sanitize(rows: &mut [Row], series_keys: &[String]) {
    for row in rows.iter_mut() {
        for key in series_keys {
            if let Some(n) = cell::try_numeric(row.get(key)) {
                row.insert(key.clone(), cell::number_value(n));
            }
        }
    }
}

/// Chart resolution skill.
pub struct ChartResolver;

impl ChartResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChartResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for ChartResolver {
    fn id(&self) -> &'static str {
        "render_chart"
    }

    fn name(&self) -> &'static str {
        "Chart Renderer"
    }

    fn description(&self) -> &'static str {
        "Render a bar, line, pie or scatter chart; data, xAxisKey and seriesKeys are inferred when missing"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        &[Mode::Dashboard, Mode::Analysis]
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let request: ChartConfig = input.parse()?;
        let chart_type = request.chart_type;
        let registry = ctx.datasets.read();

        match resolve_chart(request, &registry, &ctx.settings.chart) {
            Resolution::Resolved(config) => {
                let text = format!("{} with {} points", chart_type.name(), config.data.len());
                Ok(SkillOutput::chart(config).with_text(text))
            }
            Resolution::NoData => Ok(SkillOutput::soft_error("no data available")),
        }
    }
}
