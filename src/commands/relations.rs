use crate::cli::LinkArgs;
use crate::client::{JiraClient, Mode};
use crate::error::{JiraError, Result};
use crate::jira;
use crate::lookup::SUBTASK_TYPE;
use crate::output;
use crate::types::{Field, Issue};

use super::reconciler;

/// Link type the server uses for parent/sub-task relations.
const SUBTASK_LINK: &str = "jira_subtask_link";

pub async fn link(client: &JiraClient, args: LinkArgs) -> Result<()> {
    jira::link_issues(client, &args.from, &args.link_type, &args.to, args.comment.as_deref()).await?;
    output::print_message(&format!("Linked {} {} {}", args.from, args.link_type, args.to));
    Ok(())
}

pub async fn unlink(client: &JiraClient, from: &str, link_type: &str, to: &str) -> Result<()> {
    if link_type.eq_ignore_ascii_case(SUBTASK_LINK) {
        log::info!("Unlinking subtasks is currently unsupported");
        return Ok(());
    }

    let links = jira::issue_links(client, from).await?;
    let found = links.iter().find(|link| {
        link.link_type.name.eq_ignore_ascii_case(link_type)
            && link.outward_issue.as_ref().is_some_and(|issue| issue.key == to)
    });

    match found {
        Some(link) => {
            jira::delete_issue_link(client, &link.id).await?;
            output::print_message(&format!("Unlinked {from} {link_type} {to}"));
            Ok(())
        }
        None if client.mode() == Mode::Noop => Ok(()),
        None => Err(JiraError::LinkNotFound {
            from: from.to_string(),
            link_type: link_type.to_string(),
            to: to.to_string(),
        }),
    }
}

/// Turn `child` into a sub-task of `parent`.
pub async fn subtask(client: &JiraClient, child: &str, parent: &str) -> Result<()> {
    let project = jira::project_of(child)?;
    jira::link_issues(client, parent, SUBTASK_LINK, child, None).await?;

    let mut reconciler = reconciler(client, project);
    let mut issue = Issue::new();
    reconciler
        .reconcile(&mut issue, Field::IssueType.wire_name(), SUBTASK_TYPE)
        .await?;
    reconciler
        .reconcile(&mut issue, Field::Parent.wire_name(), parent)
        .await?;

    jira::modify_issue(client, child, issue.to_fields()).await?;
    output::print_message(&format!("{child} is now a sub-task of {parent}"));
    Ok(())
}

pub async fn epic_link(client: &JiraClient, epic: &str, keys: &[String]) -> Result<()> {
    jira::epic_link(client, keys, epic).await?;
    let base = jira::server_base_url(client).await?;
    output::print_message(&format!(
        "Added {} to epic {}",
        keys.join(", "),
        jira::browse_url(&base, epic)
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_links(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/api/latest/issue/INFOSYS-12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "INFOSYS-12",
                "fields": {"issuelinks": [
                    {"id": "100", "type": {"name": "Relates"}, "outwardIssue": {"key": "INFOSYS-13"}},
                    {"id": 101, "type": {"name": "Blocks"}, "outwardIssue": {"key": "INFOSYS-13"}},
                    {"id": "102", "type": {"name": "Blocks"}, "inwardIssue": {"key": "INFOSYS-14"}}
                ]}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unlink_deletes_matching_outward_link() {
        let server = MockServer::start().await;
        mock_links(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/rest/api/latest/issueLink/101"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = JiraClient::new(&server.uri(), Mode::Live).unwrap();
        unlink(&client, "INFOSYS-12", "blocks", "INFOSYS-13").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unlink_reports_missing_link() {
        let server = MockServer::start().await;
        mock_links(&server).await;

        let client = JiraClient::new(&server.uri(), Mode::Live).unwrap();
        let err = unlink(&client, "INFOSYS-12", "Blocks", "INFOSYS-14").await.unwrap_err();
        assert!(matches!(err, JiraError::LinkNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unlink_subtask_is_skipped() {
        let client = JiraClient::new("http://127.0.0.1:9/", Mode::Live).unwrap();
        unlink(&client, "INFOSYS-12", "jira_subtask_link", "INFOSYS-13").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_subtask_links_then_reparents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/latest/issueLink"))
            .and(body_json(json!({
                "type": {"name": "jira_subtask_link"},
                "inwardIssue": {"key": "INFOSYS-12"},
                "outwardIssue": {"key": "INFOSYS-13"}
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/latest/issue/createmeta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": [{"issuetypes": [
                    {"id": "4", "name": "Sub-task"},
                    {"id": "7", "name": "Story"}
                ]}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/rest/api/latest/issue/INFOSYS-13"))
            .and(body_json(json!({"fields": {
                "issuetype": {"id": "4"},
                "parent": {"key": "INFOSYS-12"}
            }})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = JiraClient::new(&server.uri(), Mode::Live).unwrap();
        subtask(&client, "INFOSYS-13", "INFOSYS-12").await.unwrap();
    }

    #[tokio::test]
    async fn test_noop_relations_do_not_fail() {
        let client = JiraClient::new("http://127.0.0.1:9/", Mode::Noop).unwrap();
        unlink(&client, "INFOSYS-12", "Blocks", "INFOSYS-13").await.unwrap();
        epic_link(&client, "INFOSYS-1", &["INFOSYS-12".to_string()]).await.unwrap();
    }
}
