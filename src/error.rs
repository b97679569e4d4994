use std::path::PathBuf;
use thiserror::Error;

use crate::lookup::Category;

#[derive(Error, Debug)]
pub enum JiraError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid Jira URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Please specify the Jira user (--user, JIRA_USER or `user` in the config file)")]
    MissingUser,

    #[error("Please specify the Jira URL (--url, JIRA_URL or `url` in the config file)")]
    MissingUrl,

    #[error("You must specify a project key")]
    MissingProject,

    #[error("Login failed")]
    LoginFailed,

    #[error("Unknown issue attribute: {0}")]
    UnknownAttribute(String),

    #[error("Cannot set '{0}' before the issue type is known")]
    MissingIssueType(String),

    #[error("You specified '{value}' for attribute '{category}', known values are: {known}")]
    UnknownValue {
        category: Category,
        value: String,
        known: String,
    },

    #[error("You specified unknown ID '{id}' for attribute '{category}', known values are: {known}")]
    UnknownId {
        category: Category,
        id: String,
        known: String,
    },

    #[error("Unhandled value for attribute '{attribute}': {value}")]
    InvalidValue { attribute: String, value: String },

    #[error("Duration has dubious format: {0} (expected e.g. 30m, 2h, 1d, 1w)")]
    InvalidDuration(String),

    #[error("Issue type must be sub-task for a parent to be valid")]
    ParentRequiresSubtask,

    #[error("Invalid issue key: {0} (expected PROJECT-123)")]
    InvalidIssueKey(String),

    #[error("Cannot determine issue type of issue {0}")]
    UnknownIssueType(String),

    #[error("No '{transition}' transition available for {key}")]
    TransitionNotFound { key: String, transition: String },

    #[error("No '{link_type}' link from {from} to {to}")]
    LinkNotFound {
        from: String,
        link_type: String,
        to: String,
    },

    #[error("No such file: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read template {path}: {source}")]
    TemplateRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML template: {0}")]
    TemplateParse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, JiraError>;
