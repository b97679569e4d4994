use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::reference::{RefKey, Reference};
use super::time_tracking::TimeTracking;
use crate::lookup::Category;

/// Custom fields are addressed by their server id, e.g. `customfield_10010`.
pub const CUSTOM_FIELD_PREFIX: &str = "customfield_";

pub const TIME_TRACKING: &str = "timetracking";

pub type CustomFields = BTreeMap<String, Value>;

/// The fixed fields of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Summary,
    Description,
    Environment,
    DueDate,
    Project,
    IssueType,
    Assignee,
    Priority,
    Parent,
    Versions,
    FixVersions,
    Components,
    Labels,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Summary,
        Field::Description,
        Field::Environment,
        Field::DueDate,
        Field::Project,
        Field::IssueType,
        Field::Assignee,
        Field::Priority,
        Field::Parent,
        Field::Versions,
        Field::FixVersions,
        Field::Components,
        Field::Labels,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Environment => "environment",
            Self::DueDate => "duedate",
            Self::Project => "project",
            Self::IssueType => "issuetype",
            Self::Assignee => "assignee",
            Self::Priority => "priority",
            Self::Parent => "parent",
            Self::Versions => "versions",
            Self::FixVersions => "fixVersions",
            Self::Components => "components",
            Self::Labels => "labels",
        }
    }

    /// Case-insensitive, accepts the wire name and a few aliases.
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name.to_lowercase().as_str() {
            "summary" => Self::Summary,
            "description" => Self::Description,
            "environment" => Self::Environment,
            "duedate" | "due-date" | "due_date" => Self::DueDate,
            "project" => Self::Project,
            "issuetype" | "issue-type" | "issue_type" | "type" => Self::IssueType,
            "assignee" => Self::Assignee,
            "priority" => Self::Priority,
            "parent" => Self::Parent,
            "versions" | "affectsversions" | "affects-versions" | "affects_versions" => {
                Self::Versions
            }
            "fixversions" | "fix-versions" | "fix_versions" => Self::FixVersions,
            "components" => Self::Components,
            "labels" => Self::Labels,
            _ => return None,
        };
        Some(field)
    }

    /// The shape a fresh issue carries for this field.
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Summary | Self::Description | Self::Environment | Self::DueDate => {
                FieldValue::Scalar(String::new())
            }
            Self::Project | Self::IssueType | Self::Priority => {
                FieldValue::Reference(Reference::unset(RefKey::Id))
            }
            Self::Assignee => FieldValue::Reference(Reference::unset(RefKey::Name)),
            Self::Parent => FieldValue::Reference(Reference::unset(RefKey::Key)),
            Self::Versions | Self::FixVersions | Self::Components => {
                FieldValue::ReferenceList(vec![Reference::unset(RefKey::Id)])
            }
            Self::Labels => FieldValue::StringList(Vec::new()),
        }
    }

    /// The lookup table that resolves names for id-keyed references.
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Project => Some(Category::Project),
            Self::IssueType => Some(Category::IssueType),
            Self::Priority => Some(Category::Priority),
            Self::Versions => Some(Category::Versions),
            Self::FixVersions => Some(Category::FixVersions),
            Self::Components => Some(Category::Components),
            _ => None,
        }
    }
}

/// A field value, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(String),
    Reference(Reference),
    ReferenceList(Vec<Reference>),
    StringList(Vec<String>),
}

impl FieldValue {
    /// True for values that carry nothing worth sending.
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::Reference(r) => r.is_unset(),
            Self::ReferenceList(refs) => refs.iter().all(Reference::is_unset),
            Self::StringList(items) => items.is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(s) => Value::String(s.clone()),
            Self::Reference(r) => r.to_json(),
            Self::ReferenceList(refs) => Value::Array(refs.iter().map(Reference::to_json).collect()),
            Self::StringList(items) => json!(items),
        }
    }

    /// Convert an already-structured value into the shape of `self`.
    pub fn from_json_like(&self, value: &Value) -> Option<FieldValue> {
        match self {
            Self::Scalar(_) => scalar_text(value).map(FieldValue::Scalar),
            Self::Reference(_) => Reference::from_json(value).map(FieldValue::Reference),
            Self::ReferenceList(_) => value
                .as_array()?
                .iter()
                .map(Reference::from_json)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::ReferenceList),
            Self::StringList(_) => value
                .as_array()?
                .iter()
                .map(scalar_text)
                .collect::<Option<Vec<_>>>()
                .map(FieldValue::StringList),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One issue being assembled for a create or modify call.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    values: BTreeMap<Field, FieldValue>,
    time_tracking: TimeTracking,
    custom_fields: CustomFields,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            values: Field::ALL.iter().map(|f| (*f, f.default_value())).collect(),
            time_tracking: TimeTracking::default(),
            custom_fields: CustomFields::new(),
        }
    }
}

impl Issue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        // every field is populated by Default and never removed
        &self.values[&field]
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn push_label(&mut self, label: impl Into<String>) {
        match self.values.get_mut(&Field::Labels) {
            Some(FieldValue::StringList(labels)) => labels.push(label.into()),
            _ => self.set(Field::Labels, FieldValue::StringList(vec![label.into()])),
        }
    }

    /// The resolved issue type id, if one has been set.
    pub fn issue_type_id(&self) -> Option<&str> {
        match self.get(Field::IssueType) {
            FieldValue::Reference(r) => r.value.as_deref(),
            _ => None,
        }
    }

    pub fn time_tracking(&self) -> &TimeTracking {
        &self.time_tracking
    }

    pub fn time_tracking_mut(&mut self) -> &mut TimeTracking {
        &mut self.time_tracking
    }

    pub fn custom_field(&self, id: &str) -> Option<&Value> {
        self.custom_fields.get(id)
    }

    pub fn set_custom_field(&mut self, id: impl Into<String>, value: Value) {
        self.custom_fields.insert(id.into(), value);
    }

    /// The `fields` object for the REST API, without unset defaults.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for (field, value) in &self.values {
            if !value.is_unset() {
                fields.insert(field.wire_name().to_string(), value.to_json());
            }
        }
        if !self.time_tracking.is_empty() {
            fields.insert(TIME_TRACKING.to_string(), json!(self.time_tracking));
        }
        for (id, value) in &self.custom_fields {
            if !value.is_null() {
                fields.insert(id.clone(), value.clone());
            }
        }
        fields
    }
}
