//! Query skill: sort, limit and project dataset rows.
//!
//! Sorting compares two cells numerically when both coerce to numbers and
//! falls back to string order otherwise. The fallback is a total order
//! (numbers, then strings, with null/absent cells always last) so a mixed
//! column still sorts deterministically.

use std::borrow::Cow;
use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::cell::Cell;
use shared::dataset::{Dataset, Row};
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than "asc" sorts descending.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub columns: &'a [String],
    pub sort_by: Option<&'a str>,
    pub order: SortOrder,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey<'a> {
    Number(f64),
    Text(Cow<'a, str>),
    Missing,
}

impl<'a> SortKey<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match Cell::classify(value) {
            Cell::Null => SortKey::Missing,
            cell => match cell.as_number() {
                Some(n) => SortKey::Number(n),
                None => match value {
                    Some(Value::String(s)) => SortKey::Text(Cow::Borrowed(s.as_str())),
                    Some(other) => SortKey::Text(Cow::Owned(other.to_string())),
                    None => SortKey::Missing,
                },
            },
        }
    }

    fn compare(&self, other: &Self, order: SortOrder) -> Ordering {
        let ord = match (self, other) {
            (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
            (SortKey::Missing, _) => return Ordering::Greater,
            (_, SortKey::Missing) => return Ordering::Less,
            (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Sort (stable), truncate, then project to the requested columns.
///
/// Requested columns a row lacks come back as `null`; sorting by a column no
/// row has leaves the original order untouched.
pub fn query(dataset: &Dataset, request: &QueryRequest<'_>) -> Vec<Row> {
    let mut keyed: Vec<(SortKey<'_>, &Row)> = dataset
        .rows()
        .iter()
        .map(|row| {
            let key = match request.sort_by {
                Some(column) => SortKey::of(row.get(column)),
                None => SortKey::Missing,
            };
            (key, row)
        })
        .collect();

    if request.sort_by.is_some() {
        keyed.sort_by(|(a, _), (b, _)| a.compare(b, request.order));
    }

    keyed
        .into_iter()
        .take(request.limit)
        .map(|(_, row)| project(row, request.columns))
        .collect()
}

fn project(row: &Row, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    #[serde(default)]
    dataset_id: String,
    columns: Vec<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    order: Option<String>,
    #[serde(default, deserialize_with = "shared::params::opt_count")]
    limit: Option<usize>,
}

/// Ranking / top-N query skill.
pub struct DatasetQuery;

impl DatasetQuery {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DatasetQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for DatasetQuery {
    fn id(&self) -> &'static str {
        "query_dataset"
    }

    fn name(&self) -> &'static str {
        "Dataset Query"
    }

    fn description(&self) -> &'static str {
        "Return selected columns of a dataset, optionally sorted by a column (asc/desc) and limited to N rows"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        &[Mode::Analysis, Mode::Dashboard]
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let params: QueryParams = input.parse()?;
        let registry = ctx.datasets.read();
        let dataset = registry.resolve(&params.dataset_id)?;

        let request = QueryRequest {
            columns: &params.columns,
            sort_by: params.sort_by.as_deref().filter(|s| !s.trim().is_empty()),
            order: params
                .order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            limit: params.limit.unwrap_or(ctx.settings.default_query_limit),
        };

        let rows = query(dataset, &request);
        tracing::debug!(
            dataset_id = dataset.id(),
            sort_by = ?request.sort_by,
            returned = rows.len(),
            "query executed"
        );

        Ok(SkillOutput::table(rows).with_text(format!("Querying {}", dataset.name())))
    }
}
