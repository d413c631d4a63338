//! Agent prompts for each analysis mode.
//!
//! The system prompt tells the model who it is and which tools the current
//! mode exposes; the dataset context is prefixed to every user turn so the
//! model always sees the registry as it is right now.

use shared::dataset::DatasetRegistry;
use shared::skill::{Mode, PermissionLevel};

use crate::skills::SkillInfo;

/// Focus, guidelines and examples for one mode
#[derive(Clone, Debug)]
pub struct ModePrompt {
    pub mode: Mode,
    pub focus: &'static str,
    pub guidelines: &'static [&'static str],
    pub example_questions: &'static [&'static str],
}

/// Get the mode prompt for a given mode
pub fn get_mode_prompt(mode: Mode) -> &'static ModePrompt {
    match mode {
        Mode::Cleaning => &CLEANING_PROMPT,
        Mode::Analysis => &ANALYSIS_PROMPT,
        Mode::Dashboard => &DASHBOARD_PROMPT,
    }
}

/// Get the complete system prompt for a mode
pub fn get_system_prompt(mode: Mode, tools: &[SkillInfo], max_datasets: usize) -> String {
    let mode_prompt = get_mode_prompt(mode);

    format!(
        r#"# Data assistant - {mode_name}

You help the user understand tabular datasets that are already loaded in this
session (uploaded files or open-data catalog downloads). {focus}

## Guidelines
{guidelines}

## Example Requests
{examples}

## Tools
{tools}

## Rules
- Always work on the real rows through the tools; never invent values.
- Refer to datasets by the id shown in the dataset context.
- If a tool answers with an error, read it and retry with other arguments.
- Find unknown catalog ids with `search_catalog` before calling `fetch_dataset`.
- At most {max} datasets can be loaded at once; remove one before fetching another."#,
        mode_name = mode.display_name(),
        focus = mode_prompt.focus,
        guidelines = format_list(mode_prompt.guidelines),
        examples = format_examples(mode_prompt.example_questions),
        tools = format_tools(tools),
        max = max_datasets,
    )
}

/// One line per loaded dataset, oldest first.
///
/// `Active dataset [id]: "name" (source). Columns: a, b. Rows: n.`
pub fn dataset_context(registry: &DatasetRegistry) -> String {
    registry
        .list()
        .iter()
        .map(|ds| {
            format!(
                "Active dataset [{}]: \"{}\" ({}). Columns: {}. Rows: {}.",
                ds.id(),
                ds.name(),
                ds.source().as_str(),
                ds.columns().join(", "),
                ds.row_count()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The text actually sent for a user turn: dataset context, then the query.
pub fn user_turn(registry: &DatasetRegistry, message: &str) -> String {
    format!("{}\n\nUser query: {}", dataset_context(registry), message)
}

fn format_tools(tools: &[SkillInfo]) -> String {
    if tools.is_empty() {
        return "No tools are available in this mode.".to_string();
    }
    tools
        .iter()
        .map(|tool| {
            let note = match tool.permission_level {
                PermissionLevel::Sensitive => " (needs user approval)",
                PermissionLevel::Safe => "",
            };
            format!("- `{}`: {}{}", tool.id, tool.description, note)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_examples(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("- \"{}\"", item))
        .collect::<Vec<_>>()
        .join("\n")
}

static CLEANING_PROMPT: ModePrompt = ModePrompt {
    mode: Mode::Cleaning,
    focus: "Right now the user wants to find and fix missing or inconsistent values.",
    guidelines: &[
        "Start with get_dataset_stats to see nulls and blanks per column",
        "Say how many rows an operation removed or filled",
        "Prefer filling over dropping when most of a row is intact",
    ],
    example_questions: &[
        "Which columns have missing values?",
        "Fill the empty prices with the average",
        "Drop the rows without a municipality",
    ],
};

static ANALYSIS_PROMPT: ModePrompt = ModePrompt {
    mode: Mode::Analysis,
    focus: "Right now the user wants answers: counts, rankings, averages.",
    guidelines: &[
        "Use analyze_column for distributions and numeric summaries",
        "Use query_dataset for top-N questions",
        "Explain results in plain words with the key numbers",
    ],
    example_questions: &[
        "What are the 5 cities with the most sales?",
        "What is the average amount?",
        "How are the categories distributed?",
    ],
};

static DASHBOARD_PROMPT: ModePrompt = ModePrompt {
    mode: Mode::Dashboard,
    focus: "Right now the user wants charts.",
    guidelines: &[
        "Use render_chart; data may be omitted to plot the latest dataset",
        "Bar and pie charts suit categories, line charts suit ordered x values",
        "Give every chart a short title",
    ],
    example_questions: &[
        "Plot sales by city",
        "Show the trend per year",
        "Make a pie chart of the categories",
    ],
};
