use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::client::JiraClient;
use crate::error::Result;
use crate::jira;
use crate::output;
use crate::types::is_valid_duration;

/// One worklog request: query string for the endpoint plus its body.
#[derive(Debug, PartialEq)]
pub struct WorkLog {
    pub query: String,
    pub body: Value,
}

/// `None` when a duration is malformed; that is logged and nothing is sent.
pub fn build(
    comment: Option<&str>,
    spent: Option<&str>,
    remaining: Option<&str>,
    started: DateTime<Utc>,
) -> Option<WorkLog> {
    for (what, value) in [("Time spent", spent), ("Time remaining", remaining)] {
        if let Some(value) = value.filter(|v| !is_valid_duration(v)) {
            log::warn!("{what} has dubious format: {value}: no action taken");
            return None;
        }
    }

    let mut body = serde_json::Map::new();
    if let Some(comment) = comment {
        body.insert("comment".to_string(), json!(comment));
    }

    let query = match (spent, remaining) {
        (None, None) => {
            // the server rejects a worklog without time spent
            body.insert(
                "started".to_string(),
                json!(started.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()),
            );
            body.insert("timeSpent".to_string(), json!("1m"));
            String::new()
        }
        (None, Some(remaining)) => format!("?adjustEstimate=new&newEstimate={remaining}"),
        (Some(spent), None) => {
            body.insert("timeSpent".to_string(), json!(spent));
            "?adjustEstimate=auto".to_string()
        }
        (Some(spent), Some(remaining)) => {
            body.insert("timeSpent".to_string(), json!(spent));
            format!("?adjustEstimate=new&newEstimate={remaining}")
        }
    };

    Some(WorkLog {
        query,
        body: Value::Object(body),
    })
}

pub async fn log_work(
    client: &JiraClient,
    key: &str,
    comment: Option<&str>,
    spent: Option<&str>,
    remaining: Option<&str>,
) -> Result<()> {
    let Some(worklog) = build(comment, spent, remaining, Utc::now()) else {
        return Ok(());
    };
    log::debug!("log work: {key}{} {}", worklog.query, worklog.body);
    jira::log_work(client, key, &worklog.query, &worklog.body).await?;
    output::print_message(&format!("Logged work on {key}"));
    Ok(())
}
