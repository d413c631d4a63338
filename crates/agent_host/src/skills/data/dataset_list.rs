//! Registry housekeeping skills: listing and removing datasets.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::dataset::{Dataset, DatasetSource};
use shared::skill::{Mode, PermissionLevel, Skill, SkillContext, SkillInput, SkillOutput};

/// What the agent sees of a dataset without its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub source: DatasetSource,
    pub columns: Vec<String>,
    pub row_count: usize,
}

impl From<&Dataset> for DatasetSummary {
    fn from(ds: &Dataset) -> Self {
        Self {
            id: ds.id().to_string(),
            name: ds.name().to_string(),
            source: ds.source(),
            columns: ds.columns().to_vec(),
            row_count: ds.row_count(),
        }
    }
}

pub struct ListDatasets;

#[async_trait]
impl Skill for ListDatasets {
    fn id(&self) -> &'static str {
        "list_datasets"
    }

    fn name(&self) -> &'static str {
        "List Datasets"
    }

    fn description(&self) -> &'static str {
        "List the loaded datasets with their columns and row counts, oldest first"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        Mode::all()
    }

    async fn execute(&self, _input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let registry = ctx.datasets.read();
        let summaries: Vec<DatasetSummary> = registry.list().iter().map(Into::into).collect();

        Ok(SkillOutput::data(serde_json::to_value(&summaries)?).with_text(format!(
            "{} of {} dataset slots in use",
            registry.len(),
            registry.max_datasets()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct RemoveParams {
    dataset_id: String,
}

pub struct RemoveDataset;

#[async_trait]
impl Skill for RemoveDataset {
    fn id(&self) -> &'static str {
        "remove_dataset"
    }

    fn name(&self) -> &'static str {
        "Remove Dataset"
    }

    fn description(&self) -> &'static str {
        "Unload a dataset by id to free a slot"
    }

    fn permission_level(&self) -> PermissionLevel {
        PermissionLevel::Safe
    }

    fn modes(&self) -> &'static [Mode] {
        Mode::all()
    }

    async fn execute(&self, input: SkillInput, ctx: &SkillContext) -> Result<SkillOutput> {
        let params: RemoveParams = input.parse()?;
        let mut registry = ctx.datasets.write();
        let removed = registry.remove(&params.dataset_id).is_some();

        let text = if removed {
            format!("Removed {}", params.dataset_id)
        } else {
            format!("No dataset {} to remove", params.dataset_id)
        };
        Ok(SkillOutput::data(serde_json::json!({
            "removed": removed,
            "remaining": registry.len(),
        }))
        .with_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::settings::AnalysisSettings;

    fn ctx_with(ids: &[&str]) -> SkillContext {
        let ctx = SkillContext::new(Mode::Analysis, AnalysisSettings::default());
        for id in ids {
            let row = json!({"a": 1}).as_object().cloned().unwrap();
            ctx.datasets
                .write()
                .add(Dataset::new(*id, *id, DatasetSource::File, vec![row]))
                .unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let ctx = ctx_with(&["one", "two"]);
        let output = ListDatasets.execute(SkillInput::new(), &ctx).await.unwrap();

        let data = output.data.unwrap();
        assert_eq!(data[0]["id"], "one");
        assert_eq!(data[1]["rowCount"], 1);
        assert_eq!(data[1]["source"], "file");
        assert_eq!(output.text.as_deref(), Some("2 of 3 dataset slots in use"));
    }

    #[tokio::test]
    async fn test_remove_known_and_unknown() {
        let ctx = ctx_with(&["one", "two"]);

        let input = SkillInput::new().with_param("dataset_id", json!("one"));
        let output = RemoveDataset.execute(input, &ctx).await.unwrap();
        assert_eq!(output.data.unwrap(), json!({"removed": true, "remaining": 1}));

        let input = SkillInput::new().with_param("dataset_id", json!("ghost"));
        let output = RemoveDataset.execute(input, &ctx).await.unwrap();
        assert_eq!(output.data.unwrap()["removed"], false);
        assert_eq!(ctx.datasets.read().len(), 1);
    }
}
