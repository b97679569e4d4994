use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{JiraError, Result};
use crate::session::SessionFile;

const SESSION_URI: &str = "rest/auth/latest/session";

static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"JSESSIONID=(.*?);").expect("valid cookie pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    /// Never contact the server.
    Noop,
    /// Contact the server for reads only.
    NoPost,
}

impl Mode {
    pub fn from_flags(noop: bool, nopost: bool) -> Self {
        match (noop, nopost) {
            (true, _) => Self::Noop,
            (false, true) => Self::NoPost,
            (false, false) => Self::Live,
        }
    }
}

enum Credential {
    Anonymous,
    Basic(String),
    Cookie(String),
}

pub struct JiraClient {
    http: Client,
    base_url: Url,
    credential: Credential,
    mode: Mode,
    session: Option<SessionFile>,
}

impl JiraClient {
    pub fn new(url: &str, mode: Mode) -> Result<Self> {
        // without the trailing slash, joining would replace the last path segment
        let mut base = url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|source| JiraError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        Ok(Self {
            http: Client::new(),
            base_url,
            credential: Credential::Anonymous,
            mode,
            session: None,
        })
    }

    pub fn with_session(mut self, session: SessionFile) -> Self {
        self.session = Some(session);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, uri: &str) -> Result<Url> {
        self.base_url
            .join(uri.trim_start_matches('/'))
            .map_err(|source| JiraError::InvalidUrl {
                url: uri.to_string(),
                source,
            })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        match &self.credential {
            Credential::Anonymous => builder,
            Credential::Basic(token) => builder.header(AUTHORIZATION, format!("Basic {token}")),
            Credential::Cookie(cookie) => builder.header(COOKIE, cookie),
        }
    }

    /// Reuse the stored session if it is still valid, otherwise log in with
    /// basic auth and store the new session cookie.
    pub async fn connect<F>(&mut self, user: &str, password: F) -> Result<()>
    where
        F: FnOnce() -> Result<String>,
    {
        if self.mode == Mode::Noop {
            log::info!("NOOPMODE: API will not be called");
            return Ok(());
        }

        if let Some(session) = &self.session {
            if let Some(cookie) = session.read()? {
                self.credential = Credential::Cookie(cookie);
                if self.session_is_valid().await? {
                    log::debug!("reusing session from {}", session.path().display());
                    return Ok(());
                }
                log::debug!("stored session is no longer valid");
                session.remove()?;
            }
        }

        log::debug!("make auth session for {user}");
        let password = password()?;
        self.credential = Credential::Basic(STANDARD.encode(format!("{user}:{password}")));

        let response = self
            .request(Method::GET, self.url(SESSION_URI)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(JiraError::LoginFailed);
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| SESSION_COOKIE.find(value))
            .map(|m| m.as_str().to_string());

        // without a session cookie keep sending basic auth
        if let Some(cookie) = cookie {
            if let Some(session) = &self.session {
                session.write(&cookie)?;
            }
            self.credential = Credential::Cookie(cookie);
        }
        Ok(())
    }

    async fn session_is_valid(&self) -> Result<bool> {
        let response = self
            .request(Method::GET, self.url(SESSION_URI)?)
            .send()
            .await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Issue one REST call. `None` means the call was skipped (noop/nopost);
    /// a body that is empty or not JSON comes back as `{}`.
    pub async fn call(&self, method: Method, uri: &str, payload: Option<&Value>) -> Result<Option<Value>> {
        let url = self.url(uri)?;
        log::debug!(
            "call API: {method} {url} payload={}",
            payload.map(Value::to_string).unwrap_or_default()
        );

        match self.mode {
            Mode::Noop => {
                log::debug!("NOOP mode, return before API call");
                return Ok(None);
            }
            Mode::NoPost if method == Method::POST || method == Method::PUT => {
                log::debug!("NOPOST mode, return before API call");
                return Ok(None);
            }
            _ => {}
        }

        let mut request = self.request(method, url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        let response = request.send().await?;
        let status = response.status();
        log::debug!("response: {status}");

        if status == StatusCode::UNAUTHORIZED {
            if let Some(session) = &self.session {
                session.remove()?;
            }
            return Err(JiraError::LoginFailed);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());

        if !status.is_success() {
            return Err(JiraError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(Some(
            serde_json::from_str(&body).unwrap_or_else(|_| Value::Object(Map::new())),
        ))
    }

    pub async fn get<T: DeserializeOwned>(&self, uri: &str) -> Result<Option<T>> {
        match self.call(Method::GET, uri, None).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
