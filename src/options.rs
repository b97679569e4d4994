//! Issue attributes given on the command line or as rc file defaults.

use clap::Args;
use serde::Deserialize;

use crate::error::{JiraError, Result};
use crate::lookup::{Category, LookupSource, EPIC_NAME, EPIC_THEME, SUBTASK_TYPE};
use crate::reconcile::{set_estimate, Reconciler};
use crate::types::{EstimateKind, Field, Issue};

/// Shared by `create`, `modify` and `template`, and by the `[issues]` table
/// of the config file.
#[derive(Args, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IssueOptions {
    /// Project key (e.g., INFOSYS)
    #[arg(short = 'P', long)]
    pub project: Option<String>,

    /// Issue type name (e.g., story, task, epic)
    #[arg(short = 'T', long, visible_alias = "type")]
    #[serde(alias = "type")]
    pub issuetype: Option<String>,

    /// Issue summary
    #[arg(short = 'S', long)]
    pub summary: Option<String>,

    /// Issue description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// Environment text
    #[arg(short = 'E', long)]
    pub environment: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub duedate: Option<String>,

    /// Assignee user name
    #[arg(short = 'A', long)]
    pub assignee: Option<String>,

    /// Priority name
    #[arg(short = 'Q', long)]
    pub priority: Option<String>,

    /// Comma-separated component names
    #[arg(short = 'C', long)]
    pub components: Option<String>,

    /// Comma-separated fix version names
    #[arg(short = 'F', long)]
    #[serde(alias = "fixVersions", alias = "fixversions")]
    pub fix_versions: Option<String>,

    /// Comma-separated affected version names
    #[arg(short = 'V', long)]
    #[serde(alias = "affectsVersions", alias = "versions")]
    pub affects_versions: Option<String>,

    /// Comma-separated labels
    #[arg(long)]
    pub labels: Option<String>,

    /// Epic key this issue belongs to
    #[arg(short = 'H', long)]
    pub epic_theme: Option<String>,

    /// Name of an epic (epic issue type only)
    #[arg(long)]
    pub epic_name: Option<String>,

    /// Original time estimate (e.g., 2h, 1d)
    #[arg(short = 't', long)]
    pub timetracking: Option<String>,

    /// Remaining time estimate (e.g., 30m)
    #[arg(short = 'r', long)]
    pub remaining: Option<String>,

    /// Parent issue key (sub-task issue type only)
    #[arg(long)]
    pub parent: Option<String>,

    /// Text prepended to every issue summary
    #[arg(long)]
    pub prefix: Option<String>,
}

impl IssueOptions {
    /// Fill every value not given on the command line from `defaults`.
    pub fn merge_defaults(&mut self, defaults: IssueOptions) {
        let IssueOptions {
            project,
            issuetype,
            summary,
            description,
            environment,
            duedate,
            assignee,
            priority,
            components,
            fix_versions,
            affects_versions,
            labels,
            epic_theme,
            epic_name,
            timetracking,
            remaining,
            parent,
            prefix,
        } = defaults;

        self.project = self.project.take().or(project);
        self.issuetype = self.issuetype.take().or(issuetype);
        self.summary = self.summary.take().or(summary);
        self.description = self.description.take().or(description);
        self.environment = self.environment.take().or(environment);
        self.duedate = self.duedate.take().or(duedate);
        self.assignee = self.assignee.take().or(assignee);
        self.priority = self.priority.take().or(priority);
        self.components = self.components.take().or(components);
        self.fix_versions = self.fix_versions.take().or(fix_versions);
        self.affects_versions = self.affects_versions.take().or(affects_versions);
        self.labels = self.labels.take().or(labels);
        self.epic_theme = self.epic_theme.take().or(epic_theme);
        self.epic_name = self.epic_name.take().or(epic_name);
        self.timetracking = self.timetracking.take().or(timetracking);
        self.remaining = self.remaining.take().or(remaining);
        self.parent = self.parent.take().or(parent);
        self.prefix = self.prefix.take().or(prefix);
    }

    /// `(attribute, value)` pairs for every plain issue field that is set.
    /// List options are split on commas, summary and description are not.
    pub fn field_values(&self) -> Vec<(Field, String)> {
        let summary = self.summary.as_ref().map(|s| match &self.prefix {
            Some(prefix) => format!("{prefix}{s}"),
            None => s.clone(),
        });

        let single = [
            (Field::Summary, summary),
            (Field::Description, self.description.clone()),
        ];
        let split = [
            (Field::Environment, &self.environment),
            (Field::DueDate, &self.duedate),
            (Field::Assignee, &self.assignee),
            (Field::Priority, &self.priority),
            (Field::Components, &self.components),
            (Field::FixVersions, &self.fix_versions),
            (Field::Versions, &self.affects_versions),
            (Field::Labels, &self.labels),
            (Field::Parent, &self.parent),
        ];

        let mut values: Vec<(Field, String)> = single
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .collect();
        for (field, value) in split {
            let Some(value) = value else { continue };
            values.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (field, v.to_string())),
            );
        }
        values
    }
}

/// Build an issue from options, resolving names through the reconciler.
///
/// `issue_type` overrides `options.issuetype`.
pub async fn build_issue<S: LookupSource>(
    reconciler: &mut Reconciler<S>,
    options: &IssueOptions,
    issue_type: Option<&str>,
) -> Result<Issue> {
    let project = options
        .project
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(JiraError::MissingProject)?;

    let mut issue = Issue::new();
    reconciler.reconcile(&mut issue, Field::Project.wire_name(), project).await?;

    // custom field labels depend on the issue type
    if let Some(issue_type) = issue_type.or(options.issuetype.as_deref()) {
        reconciler
            .reconcile(&mut issue, Field::IssueType.wire_name(), issue_type)
            .await?;
    }

    for (field, value) in options.field_values() {
        reconciler.reconcile(&mut issue, field.wire_name(), value).await?;
    }

    if let Some(estimate) = &options.timetracking {
        set_estimate(&mut issue, EstimateKind::Original, estimate);
    }
    if let Some(estimate) = &options.remaining {
        set_estimate(&mut issue, EstimateKind::Remaining, estimate);
    }

    if let Some(theme) = &options.epic_theme {
        reconciler.reconcile(&mut issue, EPIC_THEME, theme.as_str()).await?;
    }
    if let Some(name) = &options.epic_name {
        reconciler.reconcile(&mut issue, EPIC_NAME, name.as_str()).await?;
    }

    if options.parent.is_some() {
        let subtask = reconciler
            .cache()
            .table(Category::IssueType)
            .await?
            .id_of(SUBTASK_TYPE)
            .map(str::to_string);
        if subtask.is_none() || issue.issue_type_id() != subtask.as_deref() {
            return Err(JiraError::ParentRequiresSubtask);
        }
    }

    Ok(issue)
}
