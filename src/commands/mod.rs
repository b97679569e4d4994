pub mod api;
pub mod init;
pub mod issues;
pub mod lookups;
pub mod relations;
pub mod template;
pub mod worklog;

use crate::client::JiraClient;
use crate::jira::RemoteLookups;
use crate::lookup::LookupCache;
use crate::reconcile::Reconciler;

/// A reconciler whose lookups are answered by the server for `project`.
fn reconciler<'a>(client: &'a JiraClient, project: &str) -> Reconciler<RemoteLookups<'a>> {
    Reconciler::new(LookupCache::new(RemoteLookups::new(client, project)))
}
