//! Chart requests as produced by the conversational layer.

use serde::{Deserialize, Serialize};

use crate::dataset::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
}

impl ChartType {
    /// Bar and pie charts plot one value per category.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ChartType::Bar | ChartType::Pie)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartType::Bar => "Bar Chart",
            ChartType::Line => "Line Chart",
            ChartType::Pie => "Pie Chart",
            ChartType::Scatter => "Scatter Plot",
        }
    }
}

/// Chart request or resolved chart.
///
/// Agents routinely omit `data` or send keys that do not exist, so every
/// field but `type` is optional on input; the resolver fills the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default)]
    pub x_axis_key: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub series_keys: Vec<String>,
}

impl ChartConfig {
    pub fn new(chart_type: ChartType, title: impl Into<String>) -> Self {
        Self {
            chart_type,
            title: title.into(),
            description: None,
            data: Vec::new(),
            x_axis_key: None,
            series_keys: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<Row>) -> Self {
        self.data = data;
        self
    }

    pub fn with_x_axis(mut self, key: impl Into<String>) -> Self {
        self.x_axis_key = Some(key.into());
        self
    }

    pub fn with_series(mut self, key: impl Into<String>) -> Self {
        self.series_keys.push(key.into());
        self
    }
}

/// Accept `"seriesKeys": "amount"` as well as `["amount"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Nothing(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(key) => vec![key],
        OneOrMany::Many(keys) => keys,
        OneOrMany::Nothing(()) => Vec::new(),
    })
}
