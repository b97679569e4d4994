//! Jira REST endpoints, and the server-backed lookup source and issue sink.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::client::{JiraClient, Mode};
use crate::error::{JiraError, Result};
use crate::lookup::{offline_custom_fields, offline_entries, Category, LookupSource};
use crate::output;
use crate::responses::{
    CreateMeta, CreatedIssue, IdName, IssueLink, IssueSummary, ProjectRef, ServerInfo, Transition,
    Transitions,
};
use crate::template::IssueSink;
use crate::types::{Issue, CUSTOM_FIELD_PREFIX};

pub const API: &str = "rest/api/latest";

static ISSUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)-\d+$").expect("valid issue key pattern"));

/// The project part of an issue key such as `INFOSYS-12`.
pub fn project_of(key: &str) -> Result<&str> {
    ISSUE_KEY
        .captures(key)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| JiraError::InvalidIssueKey(key.to_string()))
}

/// Base URL for browse links, as the server reports it.
pub async fn server_base_url(client: &JiraClient) -> Result<String> {
    let info: Option<ServerInfo> = client.get(&format!("{API}/serverInfo")).await?;
    Ok(match info {
        Some(info) => info.base_url,
        None => client.base_url().as_str().trim_end_matches('/').to_string(),
    })
}

pub fn browse_url(base: &str, key: &str) -> String {
    format!("{}/browse/{key}", base.trim_end_matches('/'))
}

/// Create an issue. Returns `NOOP` when the call was skipped.
pub async fn create_issue(client: &JiraClient, issue: &Issue) -> Result<String> {
    let payload = json!({ "fields": issue.to_fields() });
    let created = client
        .call(Method::POST, &format!("{API}/issue"), Some(&payload))
        .await?;
    match created {
        Some(value) => Ok(serde_json::from_value::<CreatedIssue>(value)?.key),
        None => Ok("NOOP".to_string()),
    }
}

pub async fn modify_issue(client: &JiraClient, key: &str, fields: Map<String, Value>) -> Result<()> {
    let payload = json!({ "fields": fields });
    client
        .call(Method::PUT, &format!("{API}/issue/{key}"), Some(&payload))
        .await?;
    Ok(())
}

pub async fn get_issue(client: &JiraClient, key: &str) -> Result<Option<Value>> {
    client.call(Method::GET, &format!("{API}/issue/{key}"), None).await
}

pub async fn delete_issue(client: &JiraClient, key: &str) -> Result<()> {
    client
        .call(Method::DELETE, &format!("{API}/issue/{key}?deleteSubtasks=true"), None)
        .await?;
    Ok(())
}

pub async fn add_comment(client: &JiraClient, key: &str, body: &str) -> Result<()> {
    let payload = json!({ "body": body });
    client
        .call(Method::POST, &format!("{API}/issue/{key}/comment"), Some(&payload))
        .await?;
    Ok(())
}

pub async fn link_issues(
    client: &JiraClient,
    from: &str,
    link_type: &str,
    to: &str,
    comment: Option<&str>,
) -> Result<()> {
    log::debug!("link {from} -> {link_type} -> {to}");
    let mut payload = json!({
        "type": {"name": link_type},
        "inwardIssue": {"key": from},
        "outwardIssue": {"key": to},
    });
    if let Some(comment) = comment {
        payload["comment"] = json!({ "body": comment });
    }
    client
        .call(Method::POST, &format!("{API}/issueLink"), Some(&payload))
        .await?;
    Ok(())
}

pub async fn issue_links(client: &JiraClient, key: &str) -> Result<Vec<IssueLink>> {
    let issue: Option<IssueSummary> = client.get(&format!("{API}/issue/{key}")).await?;
    Ok(issue.map(|i| i.fields.issuelinks).unwrap_or_default())
}

pub async fn delete_issue_link(client: &JiraClient, id: &str) -> Result<()> {
    client
        .call(Method::DELETE, &format!("{API}/issueLink/{id}"), None)
        .await?;
    Ok(())
}

/// Add issues to an epic through the agile (greenhopper) API.
pub async fn epic_link(client: &JiraClient, keys: &[String], epic: &str) -> Result<()> {
    let payload = json!({ "ignoreEpics": true, "issueKeys": keys });
    client
        .call(
            Method::PUT,
            &format!("rest/greenhopper/1.0/epics/{epic}/add"),
            Some(&payload),
        )
        .await?;
    Ok(())
}

/// `None` when the server was not asked.
pub async fn transitions(client: &JiraClient, key: &str) -> Result<Option<Vec<Transition>>> {
    let transitions: Option<Transitions> = client
        .get(&format!("{API}/issue/{key}/transitions"))
        .await?;
    Ok(transitions.map(|t| t.transitions))
}

pub async fn transition_issue(
    client: &JiraClient,
    key: &str,
    transition_id: &str,
    resolution_id: &str,
) -> Result<()> {
    let payload = json!({
        "transition": {"id": transition_id},
        "fields": {"resolution": {"id": resolution_id}},
    });
    client
        .call(Method::POST, &format!("{API}/issue/{key}/transitions"), Some(&payload))
        .await?;
    Ok(())
}

/// `query` carries the `adjustEstimate` parameters, if any.
pub async fn log_work(client: &JiraClient, key: &str, query: &str, body: &Value) -> Result<()> {
    client
        .call(Method::POST, &format!("{API}/issue/{key}/worklog{query}"), Some(body))
        .await?;
    Ok(())
}

/// Lookup tables for one project, read from the server.
pub struct RemoteLookups<'a> {
    client: &'a JiraClient,
    project: String,
}

impl<'a> RemoteLookups<'a> {
    pub fn new(client: &'a JiraClient, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
        }
    }

    async fn list(&self, uri: &str) -> Result<Vec<IdName>> {
        let entries: Option<Vec<IdName>> = self.client.get(uri).await?;
        Ok(entries.unwrap_or_default())
    }
}

#[async_trait(?Send)]
impl LookupSource for RemoteLookups<'_> {
    async fn fetch(&self, category: Category) -> Result<Vec<IdName>> {
        if self.is_offline() {
            return Ok(offline_entries(category));
        }

        let project = &self.project;
        match category {
            Category::Project => {
                let found: Option<ProjectRef> = self.client.get(&format!("{API}/project/{project}")).await?;
                Ok(found
                    .map(|p| vec![IdName::new(p.id, project.as_str())])
                    .unwrap_or_default())
            }
            Category::IssueType => {
                let meta: Option<CreateMeta> = self
                    .client
                    .get(&format!("{API}/issue/createmeta?projectKeys={project}"))
                    .await?;
                Ok(meta
                    .and_then(|m| m.projects.into_iter().next())
                    .map(|p| {
                        p.issuetypes
                            .into_iter()
                            .map(|t| IdName::new(t.id, t.name))
                            .collect()
                    })
                    .unwrap_or_default())
            }
            Category::Priority => self.list(&format!("{API}/priority")).await,
            Category::Versions | Category::FixVersions => {
                self.list(&format!("{API}/project/{project}/versions")).await
            }
            Category::Components => self.list(&format!("{API}/project/{project}/components")).await,
            Category::Resolutions => self.list(&format!("{API}/resolution")).await,
        }
    }

    async fn fetch_custom_fields(&self, issue_type_id: &str) -> Result<Vec<IdName>> {
        if self.is_offline() {
            return Ok(offline_custom_fields(issue_type_id));
        }

        let meta: Option<CreateMeta> = self
            .client
            .get(&format!(
                "{API}/issue/createmeta?projectKeys={}&issuetypeIds={issue_type_id}&expand=projects.issuetypes.fields",
                self.project
            ))
            .await?;

        let mut fields = Vec::new();
        for project in meta.map(|m| m.projects).unwrap_or_default() {
            for issue_type in project.issuetypes {
                fields.extend(
                    issue_type
                        .fields
                        .into_iter()
                        .filter(|(id, _)| id.starts_with(CUSTOM_FIELD_PREFIX))
                        .map(|(id, field)| IdName::new(id, field.name)),
                );
            }
        }
        Ok(fields)
    }

    fn is_offline(&self) -> bool {
        self.client.mode() == Mode::Noop
    }
}

/// Creates template issues on the server and reports each one.
pub struct RemoteSink<'a> {
    client: &'a JiraClient,
    base_url: String,
}

impl<'a> RemoteSink<'a> {
    pub fn new(client: &'a JiraClient, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait(?Send)]
impl IssueSink for RemoteSink<'_> {
    async fn create(&mut self, issue: &Issue) -> Result<String> {
        let key = create_issue(self.client, issue).await?;
        output::print_message(&format!("Created {}", browse_url(&self.base_url, &key)));
        Ok(key)
    }

    async fn modify(&mut self, key: &str, fields: Map<String, Value>) -> Result<()> {
        modify_issue(self.client, key, fields).await
    }

    async fn epic_link(&mut self, keys: &[String], epic: &str) -> Result<()> {
        epic_link(self.client, keys, epic).await?;
        output::print_message(&format!(
            "Added {} to epic {}",
            keys.join(", "),
            browse_url(&self.base_url, epic)
        ));
        Ok(())
    }
}
