//! Bulk creation of an epic with its stories and subtasks from YAML.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{JiraError, Result};
use crate::lookup::{LookupSource, EPIC_LINK, EPIC_THEME, SUBTASK_TYPE};
use crate::options::{build_issue, IssueOptions};
use crate::reconcile::{RawValue, Reconciler};
use crate::types::{Field, Issue, TIME_TRACKING};

pub type Attributes = BTreeMap<String, serde_yaml::Value>;

fn default_type() -> String {
    "epic".to_string()
}

fn default_subtype() -> String {
    "story".to_string()
}

#[derive(Deserialize, Debug)]
pub struct Template {
    /// Issue type of the top-level issue.
    #[serde(rename = "type", default = "default_type")]
    pub issue_type: String,
    /// Issue type of each entry in `stories`.
    #[serde(default = "default_subtype")]
    pub subtype: String,
    /// Extra epic fields (`summary`, `description`) children copy.
    #[serde(default)]
    pub inherit: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Attributes>,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(flatten)]
    pub fields: Attributes,
}

#[derive(Deserialize, Debug)]
pub struct Story {
    #[serde(default)]
    pub subtasks: Vec<Attributes>,
    #[serde(flatten)]
    pub fields: Attributes,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a template from a file, or from stdin when `location` is `-`.
    pub fn load(location: &str) -> Result<Self> {
        if location == "-" {
            return Ok(serde_yaml::from_reader(io::stdin().lock())?);
        }
        let path = Path::new(location);
        if !path.exists() {
            return Err(JiraError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| JiraError::TemplateRead {
            path: location.to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// A `project` attribute in the template stands in for a missing option.
    pub fn project(&self) -> Option<&str> {
        self.fields.get(Field::Project.wire_name()).and_then(|v| v.as_str())
    }

    fn inherits(&self, field: Field) -> bool {
        self.inherit
            .iter()
            .any(|name| Field::parse(name) == Some(field))
    }
}

/// Where expanded issues go. The server-backed implementation lives in `jira`.
#[async_trait(?Send)]
pub trait IssueSink {
    /// Create an issue and return its key.
    async fn create(&mut self, issue: &Issue) -> Result<String>;

    async fn modify(&mut self, key: &str, fields: Map<String, Value>) -> Result<()>;

    async fn epic_link(&mut self, keys: &[String], epic: &str) -> Result<()>;
}

pub struct Expander<'a, S, K> {
    reconciler: &'a mut Reconciler<S>,
    sink: &'a mut K,
    defaults: &'a IssueOptions,
}

impl<'a, S: LookupSource, K: IssueSink> Expander<'a, S, K> {
    pub fn new(reconciler: &'a mut Reconciler<S>, sink: &'a mut K, defaults: &'a IssueOptions) -> Self {
        Self {
            reconciler,
            sink,
            defaults,
        }
    }

    /// Create every issue in `template`. Returns the epic's key.
    pub async fn expand(&mut self, template: &Template) -> Result<String> {
        let issue_type = template.issue_type.as_str();
        let mut epic = build_issue(self.reconciler, self.defaults, Some(issue_type)).await?;
        self.apply(&mut epic, &template.fields).await?;
        let epic_key = self.sink.create(&epic).await?;
        log::info!("created {} {epic_key}", template.issue_type);

        let (theme_id, link_id) = self.epic_field_ids(&epic).await?;
        if let Some(theme_id) = &theme_id {
            let mut fields = Map::new();
            fields.insert(theme_id.clone(), json!([epic_key]));
            self.sink.modify(&epic_key, fields).await?;
            epic.set_custom_field(theme_id.clone(), json!([epic_key]));
        }

        let inherited = inherited_values(&epic, template, [theme_id, link_id]);

        if !template.subtasks.is_empty() {
            let mut keys = Vec::new();
            for attributes in &template.subtasks {
                keys.push(self.create_subtask(&inherited, attributes, &epic_key).await?);
            }
            self.sink.epic_link(&keys, &epic_key).await?;
        }

        if !template.stories.is_empty() {
            let mut keys = Vec::new();
            for story in &template.stories {
                let issue = self.build_child(&template.subtype, &inherited, &story.fields).await?;
                let story_key = self.sink.create(&issue).await?;
                log::debug!("created {} {story_key}", template.subtype);
                keys.push(story_key.clone());

                for attributes in &story.subtasks {
                    keys.push(self.create_subtask(&inherited, attributes, &story_key).await?);
                }
            }
            self.sink.epic_link(&keys, &epic_key).await?;
        }

        Ok(epic_key)
    }

    async fn create_subtask(
        &mut self,
        inherited: &[(String, Value)],
        attributes: &Attributes,
        parent: &str,
    ) -> Result<String> {
        let mut issue = self.build_child(SUBTASK_TYPE, inherited, attributes).await?;
        self.reconciler
            .reconcile(&mut issue, Field::Parent.wire_name(), parent)
            .await?;
        let key = self.sink.create(&issue).await?;
        log::debug!("created sub-task {key} of {parent}");
        Ok(key)
    }

    async fn build_child(
        &mut self,
        issue_type: &str,
        inherited: &[(String, Value)],
        attributes: &Attributes,
    ) -> Result<Issue> {
        let mut issue = build_issue(self.reconciler, self.defaults, Some(issue_type)).await?;
        for (attribute, value) in inherited {
            self.reconciler.reconcile(&mut issue, attribute, value.clone()).await?;
        }
        self.apply(&mut issue, attributes).await?;
        Ok(issue)
    }

    async fn apply(&mut self, issue: &mut Issue, attributes: &Attributes) -> Result<()> {
        for (attribute, value) in attributes {
            let value = RawValue::from_yaml(value.clone())?;
            self.reconciler.reconcile(issue, attribute, value).await?;
        }
        Ok(())
    }

    /// Custom field ids of `epic/theme` and `epic link` on the epic's type.
    async fn epic_field_ids(&mut self, epic: &Issue) -> Result<(Option<String>, Option<String>)> {
        let Some(type_id) = epic.issue_type_id() else {
            return Ok((None, None));
        };
        let fields = self.reconciler.cache().custom_fields(type_id).await?;
        Ok((
            fields.id_of(EPIC_THEME).map(str::to_string),
            fields.id_of(EPIC_LINK).map(str::to_string),
        ))
    }
}

/// Resolved epic values that children start from.
fn inherited_values(
    epic: &Issue,
    template: &Template,
    custom_ids: [Option<String>; 2],
) -> Vec<(String, Value)> {
    let mut values = Vec::new();
    for field in Field::ALL {
        let skip = match field {
            Field::IssueType => true,
            Field::Summary | Field::Description => !template.inherits(field),
            _ => false,
        };
        let value = epic.get(field);
        if !skip && !value.is_unset() {
            values.push((field.wire_name().to_string(), value.to_json()));
        }
    }
    if !epic.time_tracking().is_empty() {
        values.push((TIME_TRACKING.to_string(), json!(epic.time_tracking())));
    }
    for id in custom_ids.into_iter().flatten() {
        if let Some(value) = epic.custom_field(&id) {
            values.push((id, value.clone()));
        }
    }
    values
}
