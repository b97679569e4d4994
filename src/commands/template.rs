use crate::cli::TemplateArgs;
use crate::client::JiraClient;
use crate::config::Config;
use crate::error::{JiraError, Result};
use crate::jira::{self, RemoteSink};
use crate::output;
use crate::template::{Expander, Template};

use super::reconciler;

pub async fn run(client: &JiraClient, config: &Config, args: TemplateArgs) -> Result<()> {
    let mut options = args.issue;
    if !args.norcfile {
        options.merge_defaults(config.issues.clone());
    }

    let template = Template::load(&args.file)?;
    if options.project.is_none() {
        options.project = template.project().map(str::to_string);
    }
    let project = options.project.clone().ok_or(JiraError::MissingProject)?;

    let base = jira::server_base_url(client).await?;
    let mut reconciler = reconciler(client, &project);
    let mut sink = RemoteSink::new(client, base.clone());
    let epic = Expander::new(&mut reconciler, &mut sink, &options)
        .expand(&template)
        .await?;

    output::print_message(&format!("Created {}", jira::browse_url(&base, &epic)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Mode;
    use crate::options::IssueOptions;
    use std::io::Write;

    fn args(file: &str, project: Option<&str>) -> TemplateArgs {
        TemplateArgs {
            file: file.to_string(),
            issue: IssueOptions {
                project: project.map(str::to_string),
                ..Default::default()
            },
            norcfile: true,
        }
    }

    #[tokio::test]
    async fn test_template_in_noop_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "summary: Upgrade the fleet\nstories:\n  - summary: Plan\n    subtasks:\n      - summary: Write it down\n"
        )
        .unwrap();

        let client = JiraClient::new("http://127.0.0.1:9/", Mode::Noop).unwrap();
        let path = file.path().to_string_lossy().to_string();
        run(&client, &Config::default(), args(&path, Some("INFOSYS")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_template_project_fills_missing_option() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "project: INFOSYS\nsummary: Upgrade the fleet").unwrap();

        let client = JiraClient::new("http://127.0.0.1:9/", Mode::Noop).unwrap();
        let path = file.path().to_string_lossy().to_string();
        run(&client, &Config::default(), args(&path, None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_template_without_project_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "summary: Upgrade the fleet").unwrap();

        let client = JiraClient::new("http://127.0.0.1:9/", Mode::Noop).unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(matches!(
            run(&client, &Config::default(), args(&path, None)).await,
            Err(JiraError::MissingProject)
        ));
    }
}
