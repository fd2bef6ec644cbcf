use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};
use slackcat_channels::ChannelError;
use tracing::{debug, warn};

/// Slack `error` codes that mean the token itself is unusable.
const AUTH_ERRORS: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// Default `Retry-After` when Slack omits the header on a 429.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Minimal Slack Web API client. One instance per team token.
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

/// Result of `auth.test`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthIdentity {
    pub team: String,
    pub user: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl SlackClient {
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slackcat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChannelError::ConfigError(e.to_string()))?;
        Ok(Self {
            http,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Verify the token and report who we are connected as.
    pub async fn auth_test(&self) -> Result<AuthIdentity, ChannelError> {
        self.post_json("auth.test", &serde_json::json!({})).await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// GET a read method with query parameters.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ChannelError> {
        let req = self
            .http
            .get(self.url(method))
            .bearer_auth(&self.token)
            .query(query);
        self.call(method, req).await
    }

    /// POST a write method with a JSON body.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let req = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(body);
        self.call(method, req).await
    }

    /// POST a method that only accepts form-encoded arguments.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        method: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ChannelError> {
        let req = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .form(form);
        self.call(method, req).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ChannelError> {
        debug!(method, "calling Slack API");
        let resp = req.send().await.map_err(http_error)?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(method, retry_after_secs, "Slack API rate limited");
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(method, status, body = %text, "Slack API HTTP error");
            return Err(ChannelError::Http(format!("{method}: HTTP {status}")));
        }

        let value: serde_json::Value = resp.json().await.map_err(http_error)?;
        let value = check_envelope(method, value)?;
        serde_json::from_value(value)
            .map_err(|e| ChannelError::Http(format!("{method}: unexpected response: {e}")))
    }
}

/// Every Web API response carries `ok`; on failure `error` holds a short code.
pub(crate) fn check_envelope(
    method: &str,
    value: serde_json::Value,
) -> Result<serde_json::Value, ChannelError> {
    if value.get("ok").and_then(|v| v.as_bool()) == Some(true) {
        if let Some(warning) = value.get("warning").and_then(|v| v.as_str()) {
            debug!(method, warning, "Slack API warning");
        }
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown_error")
        .to_string();

    if AUTH_ERRORS.contains(&error.as_str()) {
        return Err(ChannelError::AuthFailed(error));
    }
    Err(ChannelError::Api {
        method: method.to_string(),
        error,
    })
}

pub(crate) fn http_error(e: reqwest::Error) -> ChannelError {
    if e.is_timeout() {
        ChannelError::Http(format!("request timed out: {e}"))
    } else {
        ChannelError::Http(e.to_string())
    }
}
