use serde::Serialize;
use tabled::Tabled;

use crate::cli::{LookupArgs, LookupTarget};
use crate::client::JiraClient;
use crate::config::Config;
use crate::error::{JiraError, Result};
use crate::lookup::{Category, LookupTable};
use crate::output;

use super::reconciler;

#[derive(Serialize)]
struct Entry {
    id: String,
    name: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

fn entries(table: &LookupTable) -> Vec<Entry> {
    table
        .iter()
        .map(|(id, name)| Entry {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub async fn run(client: &JiraClient, config: &Config, args: LookupArgs) -> Result<()> {
    let project = args
        .project
        .or_else(|| config.issues.project.clone())
        .ok_or(JiraError::MissingProject)?;

    let mut reconciler = reconciler(client, &project);
    let cache = reconciler.cache();

    let table = match args.what {
        LookupTarget::Table(category) => cache.table(category).await?.clone(),
        LookupTarget::CustomFields => {
            let issue_type = args
                .issue_type
                .ok_or_else(|| JiraError::MissingIssueType("custom-fields".to_string()))?;
            let type_id = cache.resolve(Category::IssueType, &issue_type).await?;
            cache.custom_fields(&type_id).await?.clone()
        }
    };

    let items = entries(&table);
    if items.is_empty() && !output::is_json_output() {
        output::print_message("Nothing found.");
        return Ok(());
    }
    output::print_table(&items, |e| EntryRow {
        id: e.id.clone(),
        name: output::truncate(&e.name, 60),
    });
    Ok(())
}
