//! Shared REST response types used across commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Jira hands out ids as strings, but some endpoints and older servers use
/// bare numbers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

/// The `{id, name}` pair every lookup endpoint returns.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdName {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

impl IdName {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// `GET project/{key}`
#[derive(Deserialize)]
pub struct ProjectRef {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

/// `GET issue/createmeta`
#[derive(Deserialize)]
pub struct CreateMeta {
    pub projects: Vec<MetaProject>,
}

#[derive(Deserialize)]
pub struct MetaProject {
    pub issuetypes: Vec<MetaIssueType>,
}

#[derive(Deserialize)]
pub struct MetaIssueType {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, MetaField>,
}

#[derive(Deserialize)]
pub struct MetaField {
    pub name: String,
}

/// `POST issue`
#[derive(Deserialize)]
pub struct CreatedIssue {
    pub key: String,
}

/// `GET serverInfo`
#[derive(Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
}

/// `GET issue/{key}/transitions`
#[derive(Deserialize)]
pub struct Transitions {
    pub transitions: Vec<Transition>,
}

#[derive(Deserialize)]
pub struct Transition {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub to: IdName,
}

/// The parts of `GET issue/{key}` commands look at.
#[derive(Deserialize)]
pub struct IssueSummary {
    pub key: String,
    pub fields: IssueSummaryFields,
}

#[derive(Deserialize)]
pub struct IssueSummaryFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub issuetype: Option<NamedRef>,
    pub status: Option<NamedRef>,
    pub priority: Option<NamedRef>,
    pub assignee: Option<Person>,
    pub created: Option<String>,
    pub updated: Option<String>,
    #[serde(default)]
    pub issuelinks: Vec<IssueLink>,
}

#[derive(Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Deserialize)]
pub struct Person {
    pub name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct IssueLink {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub link_type: NamedRef,
    #[serde(rename = "inwardIssue")]
    pub inward_issue: Option<LinkedIssue>,
    #[serde(rename = "outwardIssue")]
    pub outward_issue: Option<LinkedIssue>,
}

#[derive(Deserialize)]
pub struct LinkedIssue {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_name_accepts_string_and_numeric_ids() {
        let entries: Vec<IdName> =
            serde_json::from_value(json!([{"id": "10111", "name": "CSA"}, {"id": 4, "name": "Minor"}]))
                .unwrap();
        assert_eq!(entries[0], IdName::new("10111", "CSA"));
        assert_eq!(entries[1], IdName::new("4", "Minor"));
    }

    #[test]
    fn test_issue_summary_tolerates_missing_fields() {
        let issue: IssueSummary = serde_json::from_value(json!({
            "key": "INFOSYS-1",
            "fields": {"summary": "hello", "issuetype": {"name": "Story"}}
        }))
        .unwrap();
        assert_eq!(issue.fields.issuetype.unwrap().name, "Story");
        assert!(issue.fields.issuelinks.is_empty());
    }
}
