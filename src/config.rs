use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{JiraError, Result};
use crate::options::IssueOptions;
use crate::session::is_private;

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub jiraclient: ClientSection,
    /// Defaults for new issues.
    pub issues: IssueOptions,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub session_file: Option<PathBuf>,
}

impl Config {
    /// Load `path`, or the default config file. A missing file is an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!("no config file at {}", config_path.display());
            return Ok(Config::default());
        }

        if !is_private(&config_path).unwrap_or(true) {
            log::warn!("Config file {} is not mode 600", config_path.display());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| JiraError::ConfigRead {
                path: config_path.clone(),
                source: e,
            })?;

        Self::parse(&contents).map_err(|e| JiraError::ConfigParse {
            path: config_path,
            source: e,
        })
    }

    fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn config_dir() -> Result<PathBuf> {
        ProjectDirs::from("", "", "jiraclient")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(JiraError::NoConfigDir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the server URL: flag, then `JIRA_URL`, then the config file
    pub fn url(&self, explicit: Option<&str>) -> Result<String> {
        pick(explicit, "JIRA_URL", self.jiraclient.url.as_deref()).ok_or(JiraError::MissingUrl)
    }

    pub fn user(&self, explicit: Option<&str>) -> Result<String> {
        pick(explicit, "JIRA_USER", self.jiraclient.user.as_deref()).ok_or(JiraError::MissingUser)
    }

    /// `None` means the user has to be asked.
    pub fn password(&self, explicit: Option<&str>) -> Option<String> {
        pick(explicit, "JIRA_PASSWORD", self.jiraclient.password.as_deref())
    }

    pub fn session_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit.or(self.jiraclient.session_file.as_deref()) {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(Self::config_dir()?.join("session")),
        }
    }

    /// Contents of a freshly initialized config file.
    pub fn skeleton(url: &str, user: &str, project: Option<&str>) -> String {
        let mut contents = format!("[jiraclient]\nurl = {url:?}\nuser = {user:?}\n# password = \"\"\n\n[issues]\n");
        match project {
            Some(project) => contents.push_str(&format!("project = {project:?}\n")),
            None => contents.push_str("# project = \"INFOSYS\"\n"),
        }
        contents.push_str("# issuetype = \"story\"\n# priority = \"normal\"\n# components = \"\"\n# fixVersions = \"\"\n");
        contents
    }
}

/// The configured password, or one read from the terminal without echo.
pub fn read_password(configured: Option<String>, user: &str) -> Result<String> {
    match configured {
        Some(password) => Ok(password),
        None => Ok(rpassword::prompt_password(format!("Password for {user}: "))?),
    }
}

/// Explicit value, then environment, then config file. Empty strings count as unset.
fn pick(explicit: Option<&str>, env_var: &str, file: Option<&str>) -> Option<String> {
    explicit
        .map(String::from)
        .or_else(|| std::env::var(env_var).ok())
        .or_else(|| file.map(String::from))
        .filter(|v| !v.is_empty())
}
