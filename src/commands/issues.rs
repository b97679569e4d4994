use crate::cli::{CreateArgs, ModifyArgs};
use crate::client::JiraClient;
use crate::config::Config;
use crate::error::{JiraError, Result};
use crate::jira::{self, RemoteLookups};
use crate::lookup::{Category, OFFLINE_ID};
use crate::options::build_issue;
use crate::output;
use crate::reconcile::Reconciler;
use crate::responses::IssueSummary;
use crate::types::Field;

use super::{reconciler, worklog};

const RESOLVED: &str = "resolved";

pub async fn create(client: &JiraClient, config: &Config, args: CreateArgs) -> Result<()> {
    let mut options = args.issue;
    if !args.norcfile {
        options.merge_defaults(config.issues.clone());
    }
    let project = options.project.clone().ok_or(JiraError::MissingProject)?;

    let mut reconciler = reconciler(client, &project);
    let issue = build_issue(&mut reconciler, &options, None).await?;
    let key = jira::create_issue(client, &issue).await?;

    let base = jira::server_base_url(client).await?;
    output::print_message(&format!("Created {}", jira::browse_url(&base, &key)));

    if let Some(epic) = &args.epic_link {
        jira::epic_link(client, std::slice::from_ref(&key), epic).await?;
        output::print_message(&format!("Added {key} to epic {epic}"));
    }

    if args.worklog.is_some() || args.spent.is_some() {
        worklog::log_work(
            client,
            &key,
            args.worklog.as_deref(),
            args.spent.as_deref(),
            options.remaining.as_deref(),
        )
        .await?;
    }

    if let Some(resolution) = &args.resolve {
        resolve_with(&mut reconciler, client, &key, resolution, &base).await?;
    }

    Ok(())
}

/// Change the fields given on the command line. With nothing to change the
/// issue is shown instead.
pub async fn modify(client: &JiraClient, args: ModifyArgs) -> Result<()> {
    let project = jira::project_of(&args.key)?.to_string();
    let mut options = args.issue;
    options.project = Some(project.clone());

    let explicit_type = options.issuetype.take();
    let issue_type = match &explicit_type {
        Some(issue_type) => Some(issue_type.clone()),
        None => current_issue_type(client, &args.key).await?,
    };
    if issue_type.is_none() && (options.epic_theme.is_some() || options.epic_name.is_some()) {
        log::warn!("issue type of {} is unknown, skipping epic fields", args.key);
        options.epic_theme = None;
        options.epic_name = None;
    }

    let mut reconciler = reconciler(client, &project);
    let issue = build_issue(&mut reconciler, &options, issue_type.as_deref()).await?;

    let mut fields = issue.to_fields();
    fields.remove(Field::Project.wire_name());
    if explicit_type.is_none() {
        fields.remove(Field::IssueType.wire_name());
    }
    if fields.is_empty() {
        return show(client, &args.key).await;
    }

    jira::modify_issue(client, &args.key, fields).await?;
    let base = jira::server_base_url(client).await?;
    output::print_message(&format!("Modified {}", jira::browse_url(&base, &args.key)));
    Ok(())
}

/// The issue's type name, needed to address its custom fields.
async fn current_issue_type(client: &JiraClient, key: &str) -> Result<Option<String>> {
    let issue: Option<IssueSummary> = client.get(&format!("{}/issue/{key}", jira::API)).await?;
    match issue {
        // noop mode
        None => Ok(None),
        Some(issue) => issue
            .fields
            .issuetype
            .map(|t| Some(t.name))
            .ok_or_else(|| JiraError::UnknownIssueType(key.to_string())),
    }
}

pub async fn show(client: &JiraClient, key: &str) -> Result<()> {
    let Some(issue) = jira::get_issue(client, key).await? else {
        log::info!("NOOP: not showing {key}");
        return Ok(());
    };

    if output::is_json_output() {
        output::print_json(&issue);
        return Ok(());
    }

    let summary: IssueSummary = serde_json::from_value(issue)?;
    let base = jira::server_base_url(client).await?;
    output::print_issue(&summary, &jira::browse_url(&base, key));
    Ok(())
}

pub async fn delete(client: &JiraClient, key: &str) -> Result<()> {
    jira::delete_issue(client, key).await?;
    let base = jira::server_base_url(client).await?;
    output::print_message(&format!("Deleted {}", jira::browse_url(&base, key)));
    Ok(())
}

pub async fn comment(client: &JiraClient, key: &str, text: &str) -> Result<()> {
    jira::add_comment(client, key, text).await?;
    output::print_message(&format!("Added comment to {key}"));
    Ok(())
}

pub async fn resolve(client: &JiraClient, key: &str, resolution: &str) -> Result<()> {
    let project = jira::project_of(key)?;
    let mut reconciler = reconciler(client, project);
    let base = jira::server_base_url(client).await?;
    resolve_with(&mut reconciler, client, key, resolution, &base).await
}

async fn resolve_with(
    reconciler: &mut Reconciler<RemoteLookups<'_>>,
    client: &JiraClient,
    key: &str,
    resolution: &str,
    base: &str,
) -> Result<()> {
    let resolution_id = reconciler
        .cache()
        .resolve(Category::Resolutions, resolution)
        .await?;

    let transition_id = match jira::transitions(client, key).await? {
        None => OFFLINE_ID.to_string(),
        Some(transitions) => transitions
            .into_iter()
            .find(|t| t.to.name.eq_ignore_ascii_case(RESOLVED))
            .map(|t| {
                log::debug!("using transition {} ({})", t.name, t.id);
                t.id
            })
            .ok_or_else(|| JiraError::TransitionNotFound {
                key: key.to_string(),
                transition: RESOLVED.to_string(),
            })?,
    };

    jira::transition_issue(client, key, &transition_id, &resolution_id).await?;
    output::print_message(&format!("Resolved {}", jira::browse_url(base, key)));
    Ok(())
}
