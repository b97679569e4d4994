//! Merges loosely typed attribute values into an [`Issue`].

use serde_json::{json, Value};

use crate::error::{JiraError, Result};
use crate::lookup::{LookupCache, LookupSource, EPIC_LINK, EPIC_NAME, EPIC_THEME};
use crate::types::{
    EstimateKind, Field, FieldValue, Issue, RefKey, Reference, TimeTracking, CUSTOM_FIELD_PREFIX,
    TIME_TRACKING,
};

/// An attribute value as it arrives from the CLI, the rc file or a template.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    /// A mapping, sequence, number or boolean, kept as typed JSON.
    Structured(Value),
}

impl RawValue {
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Structured(Value::Array(items)) => items.is_empty(),
            Self::Structured(Value::Object(map)) => map.is_empty(),
            Self::Structured(Value::Null) => true,
            Self::Structured(_) => false,
        }
    }

    /// Numbers and booleans as text, for fields with a fixed shape.
    fn into_field_value(self) -> Self {
        match self {
            Self::Structured(Value::Number(n)) => Self::Text(n.to_string()),
            Self::Structured(Value::Bool(b)) => Self::Text(b.to_string()),
            other => other,
        }
    }

    fn into_json(self) -> Value {
        match self {
            Self::Text(s) => Value::String(s),
            Self::Structured(v) => v,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

pub struct Reconciler<S> {
    cache: LookupCache<S>,
}

impl<S: LookupSource> Reconciler<S> {
    pub fn new(cache: LookupCache<S>) -> Self {
        Self { cache }
    }

    pub fn cache(&mut self) -> &mut LookupCache<S> {
        &mut self.cache
    }

    /// Set `attribute` on `issue` from `value`, following the field's shape.
    pub async fn reconcile(
        &mut self,
        issue: &mut Issue,
        attribute: &str,
        value: impl Into<RawValue>,
    ) -> Result<()> {
        let value = value.into();
        log::debug!("update issue attribute ({attribute}) value ({value:?})");

        if attribute.is_empty() || value.is_empty() {
            return Ok(());
        }

        if attribute.starts_with(CUSTOM_FIELD_PREFIX) {
            issue.set_custom_field(attribute, value.into_json());
            return Ok(());
        }

        if attribute.eq_ignore_ascii_case(TIME_TRACKING) {
            return set_time_tracking(issue, value.into_field_value());
        }

        if let Some(field) = Field::parse(attribute) {
            return match value.into_field_value() {
                RawValue::Structured(json) => assign_structured(issue, field, &json),
                RawValue::Text(text) => self.assign_text(issue, field, &text).await,
            };
        }

        self.assign_custom_label(issue, attribute, value).await
    }

    async fn assign_text(&mut self, issue: &mut Issue, field: Field, text: &str) -> Result<()> {
        let value = match field.default_value() {
            FieldValue::Scalar(_) => FieldValue::Scalar(text.to_string()),
            FieldValue::StringList(_) => {
                issue.push_label(text);
                return Ok(());
            }
            FieldValue::ReferenceList(_) => {
                let id = self.resolve_id(field, text).await?;
                FieldValue::ReferenceList(vec![Reference::id(id)])
            }
            FieldValue::Reference(default) => match default.key {
                RefKey::Id => FieldValue::Reference(Reference::id(self.resolve_id(field, text).await?)),
                key => FieldValue::Reference(Reference {
                    key,
                    value: Some(text.to_string()),
                }),
            },
        };
        log::debug!("set {} to {value:?}", field.wire_name());
        issue.set(field, value);
        Ok(())
    }

    async fn resolve_id(&mut self, field: Field, text: &str) -> Result<String> {
        match field.category() {
            Some(category) => self.cache.resolve(category, text).await,
            None => Ok(text.to_string()),
        }
    }

    /// Custom fields addressed by display label, e.g. "epic/theme".
    async fn assign_custom_label(
        &mut self,
        issue: &mut Issue,
        attribute: &str,
        value: RawValue,
    ) -> Result<()> {
        let label = attribute.to_lowercase();
        let Some(type_id) = issue.issue_type_id().map(str::to_string) else {
            if is_epic_label(&label) || self.cache.is_known_custom_label(&label) {
                return Err(JiraError::MissingIssueType(attribute.to_string()));
            }
            return Err(JiraError::UnknownAttribute(attribute.to_string()));
        };

        let fields = self.cache.custom_fields(&type_id).await?;
        if let Some(id) = fields.id_of(&label).map(str::to_string) {
            let json = match value {
                RawValue::Text(text) if label == EPIC_THEME => json!([text]),
                other => other.into_json(),
            };
            log::debug!("set {id} ({label}) to {json}");
            issue.set_custom_field(id, json);
            return Ok(());
        }

        if is_epic_label(&label) || self.cache.is_known_custom_label(&label) {
            log::warn!("'{attribute}' is not a field of issue type {type_id}, ignoring it");
            return Ok(());
        }

        Err(JiraError::UnknownAttribute(attribute.to_string()))
    }
}

fn is_epic_label(label: &str) -> bool {
    matches!(label, EPIC_THEME | EPIC_NAME | EPIC_LINK)
}

fn assign_structured(issue: &mut Issue, field: Field, json: &Value) -> Result<()> {
    let value = field
        .default_value()
        .from_json_like(json)
        .ok_or_else(|| JiraError::InvalidValue {
            attribute: field.wire_name().to_string(),
            value: json.to_string(),
        })?;
    issue.set(field, value);
    Ok(())
}

fn set_time_tracking(issue: &mut Issue, value: RawValue) -> Result<()> {
    match value {
        RawValue::Text(text) => set_estimate(issue, EstimateKind::Original, &text),
        RawValue::Structured(json) => {
            let parsed = TimeTracking::from_json(&json).ok_or_else(|| JiraError::InvalidValue {
                attribute: TIME_TRACKING.to_string(),
                value: json.to_string(),
            })?;
            if let Some(v) = &parsed.original_estimate {
                set_estimate(issue, EstimateKind::Original, v);
            }
            if let Some(v) = &parsed.remaining_estimate {
                set_estimate(issue, EstimateKind::Remaining, v);
            }
        }
    }
    Ok(())
}

/// Set one of the two estimates. A malformed duration is logged and ignored.
pub fn set_estimate(issue: &mut Issue, kind: EstimateKind, value: &str) {
    if let Err(e) = issue.time_tracking_mut().set(kind, value) {
        log::warn!("{}: {e}: no action taken", kind.wire_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::tests::StaticSource;
    use crate::lookup::Category;

    fn reconciler(source: StaticSource) -> Reconciler<StaticSource> {
        Reconciler::new(LookupCache::new(source))
    }

    fn epic_source() -> StaticSource {
        StaticSource::default()
            .with(Category::IssueType, &[("6", "epic"), ("7", "story"), ("5", "sub-task")])
            .with_custom_fields(
                "6",
                &[
                    ("customfield_10010", "epic/theme"),
                    ("customfield_10441", "epic name"),
                    ("customfield_10002", "story points"),
                ],
            )
            .with_custom_fields("7", &[("customfield_10010", "epic/theme"), ("customfield_10440", "epic link")])
    }

    #[tokio::test]
    async fn test_project_resolves_to_id() {
        let mut r = reconciler(StaticSource::default().with(Category::Project, &[("10001", "infosys")]));
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "project", "INFOSYS").await.unwrap();
        assert_eq!(issue.get(Field::Project).to_json(), json!({"id": "10001"}));
    }

    #[tokio::test]
    async fn test_priority_is_overwritten() {
        let mut r = reconciler(StaticSource::default().with(Category::Priority, &[("4", "minor"), ("3", "major")]));
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "priority", "minor").await.unwrap();
        assert_eq!(issue.get(Field::Priority).to_json(), json!({"id": "4"}));
        r.reconcile(&mut issue, "priority", "major").await.unwrap();
        assert_eq!(issue.get(Field::Priority).to_json(), json!({"id": "3"}));
    }

    #[tokio::test]
    async fn test_reference_list_replaces_placeholder() {
        let mut r = reconciler(StaticSource::default().with(Category::Components, &[("10111", "csa")]));
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "components", "CSA").await.unwrap();
        assert_eq!(
            issue.get(Field::Components),
            &FieldValue::ReferenceList(vec![Reference::id("10111")])
        );

        r.reconcile(&mut issue, "components", "csa").await.unwrap();
        assert_eq!(issue.get(Field::Components).to_json(), json!([{"id": "10111"}]));
    }

    #[tokio::test]
    async fn test_unknown_component_is_an_error() {
        let mut r = reconciler(StaticSource::default().with(Category::Components, &[("10111", "csa")]));
        let mut issue = Issue::new();
        let err = r.reconcile(&mut issue, "components", "nonexistent").await.unwrap_err();
        assert!(matches!(err, JiraError::UnknownValue { .. }));
        assert!(err.to_string().contains("csa"));
    }

    #[tokio::test]
    async fn test_labels_append() {
        let mut r = reconciler(StaticSource::default());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "labels", "a").await.unwrap();
        r.reconcile(&mut issue, "labels", "b").await.unwrap();
        assert_eq!(issue.get(Field::Labels), &FieldValue::StringList(vec!["a".into(), "b".into()]));
    }

    #[tokio::test]
    async fn test_numeric_value_bypasses_name_lookup() {
        let mut r = reconciler(StaticSource::default().offline());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "fixVersions", "10033").await.unwrap();
        assert_eq!(issue.get(Field::FixVersions).to_json(), json!([{"id": "10033"}]));

        let mut r = reconciler(StaticSource::default());
        r.reconcile(&mut issue, "priority", "10033").await.unwrap();
        assert_eq!(issue.get(Field::Priority).to_json(), json!({"id": "10033"}));
    }

    #[tokio::test]
    async fn test_name_and_key_references_skip_lookup() {
        let mut r = reconciler(StaticSource::default());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "assignee", "jirauser").await.unwrap();
        r.reconcile(&mut issue, "parent", "INFOSYS-12").await.unwrap();
        assert_eq!(issue.get(Field::Assignee).to_json(), json!({"name": "jirauser"}));
        assert_eq!(issue.get(Field::Parent).to_json(), json!({"key": "INFOSYS-12"}));
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let mut r = reconciler(StaticSource::default());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "", "x").await.unwrap();
        r.reconcile(&mut issue, "summary", "").await.unwrap();
        r.reconcile(&mut issue, "labels", json!([])).await.unwrap();
        assert_eq!(issue, Issue::new());
    }

    #[tokio::test]
    async fn test_structured_values_are_assigned_directly() {
        // an empty table would reject any name, so this proves no lookup ran
        let mut r = reconciler(StaticSource::default().with(Category::Components, &[("1", "other")]));
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "components", json!([{"id": "10111"}])).await.unwrap();
        r.reconcile(&mut issue, "project", json!({"id": "10001"})).await.unwrap();
        assert_eq!(issue.get(Field::Components).to_json(), json!([{"id": "10111"}]));
        assert_eq!(issue.get(Field::Project).to_json(), json!({"id": "10001"}));

        let err = r.reconcile(&mut issue, "project", json!(["x"])).await.unwrap_err();
        assert!(matches!(err, JiraError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_custom_field_ids_are_schema_free() {
        let mut r = reconciler(StaticSource::default());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "customfield_10010", json!(["INFOSYS-1"])).await.unwrap();
        r.reconcile(&mut issue, "customfield_10441", "The Epic Name").await.unwrap();
        assert_eq!(issue.custom_field("customfield_10010"), Some(&json!(["INFOSYS-1"])));
        assert_eq!(issue.custom_field("customfield_10441"), Some(&json!("The Epic Name")));
    }

    #[tokio::test]
    async fn test_epic_labels_use_type_specific_shape() {
        let mut r = reconciler(epic_source());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "issuetype", "Epic").await.unwrap();
        r.reconcile(&mut issue, "epic/theme", "INFOSYS-1").await.unwrap();
        r.reconcile(&mut issue, "Epic Name", "The Epic Name").await.unwrap();
        r.reconcile(&mut issue, "story points", "5").await.unwrap();

        assert_eq!(issue.custom_field("customfield_10010"), Some(&json!(["INFOSYS-1"])));
        assert_eq!(issue.custom_field("customfield_10441"), Some(&json!("The Epic Name")));
        assert_eq!(issue.custom_field("customfield_10002"), Some(&json!("5")));
    }

    #[tokio::test]
    async fn test_label_missing_on_issue_type_is_skipped() {
        let mut r = reconciler(epic_source());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "issuetype", "story").await.unwrap();
        r.reconcile(&mut issue, "epic name", "ignored").await.unwrap();
        assert_eq!(issue.custom_field("customfield_10441"), None);
    }

    #[tokio::test]
    async fn test_epic_label_needs_issue_type() {
        let mut r = reconciler(epic_source());
        let mut issue = Issue::new();
        let err = r.reconcile(&mut issue, "epic/theme", "X-1").await.unwrap_err();
        assert!(matches!(err, JiraError::MissingIssueType(_)));
    }

    #[tokio::test]
    async fn test_unknown_attribute_is_an_error() {
        let mut r = reconciler(epic_source());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "issuetype", "epic").await.unwrap();
        let err = r.reconcile(&mut issue, "colour", "red").await.unwrap_err();
        assert!(matches!(err, JiraError::UnknownAttribute(a) if a == "colour"));
    }

    #[tokio::test]
    async fn test_time_tracking_validation() {
        let mut r = reconciler(StaticSource::default());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "timetracking", "2x").await.unwrap();
        assert!(issue.time_tracking().is_empty());

        r.reconcile(&mut issue, "timetracking", "2h").await.unwrap();
        assert_eq!(issue.time_tracking().original_estimate.as_deref(), Some("2h"));

        r.reconcile(&mut issue, "timetracking", json!({"remainingEstimate": "30m"}))
            .await
            .unwrap();
        assert_eq!(issue.to_fields()["timetracking"], json!({"remainingEstimate": "30m"}));
    }

    #[test]
    fn test_set_estimate_ignores_bad_format() {
        let mut issue = Issue::new();
        set_estimate(&mut issue, EstimateKind::Remaining, "3 days");
        assert!(issue.time_tracking().is_empty());
        set_estimate(&mut issue, EstimateKind::Remaining, "3d");
        assert_eq!(issue.time_tracking().remaining_estimate.as_deref(), Some("3d"));
    }

    #[test]
    fn test_raw_value_from_yaml() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("[{id: '10111'}]").unwrap();
        assert_eq!(RawValue::from_yaml(yaml).unwrap(), RawValue::Structured(json!([{"id": "10111"}])));
        let yaml: serde_yaml::Value = serde_yaml::from_str("42").unwrap();
        assert_eq!(RawValue::from_yaml(yaml).unwrap(), RawValue::Structured(json!(42)));
    }

    #[tokio::test]
    async fn test_custom_fields_keep_numbers_and_booleans() {
        let mut r = reconciler(epic_source());
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "customfield_10003", json!(true)).await.unwrap();
        r.reconcile(&mut issue, "issuetype", "epic").await.unwrap();
        r.reconcile(&mut issue, "story points", json!(5)).await.unwrap();
        assert_eq!(issue.custom_field("customfield_10003"), Some(&json!(true)));
        assert_eq!(issue.custom_field("customfield_10002"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn test_numbers_become_text_for_fixed_fields() {
        let source = StaticSource::default().with(Category::Priority, &[("4", "minor")]);
        let mut r = reconciler(source);
        let mut issue = Issue::new();
        r.reconcile(&mut issue, "priority", json!(4)).await.unwrap();
        r.reconcile(&mut issue, "environment", json!(12)).await.unwrap();
        r.reconcile(&mut issue, "timetracking", json!(3)).await.unwrap();
        assert_eq!(issue.get(Field::Priority).to_json(), json!({"id": "4"}));
        assert_eq!(issue.get(Field::Environment), &FieldValue::Scalar("12".into()));
        assert!(issue.time_tracking().is_empty());
    }
}
