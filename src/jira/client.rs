//! Jira REST API v2 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JiraConfig;
use crate::error::{ConfigError, JiraError};

use super::auth::JiraAuth;
use super::retry::{RetryPolicy, retry_with_backoff};
use super::{Issue, IssueTracker};

pub struct JiraClient {
    http: Client,
    base_url: String,
    auth: JiraAuth,
    retry: RetryPolicy,
}

impl JiraClient {
    pub fn new(base_url: &str, auth: JiraAuth, timeout: Duration) -> Result<Self, JiraError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(JiraError::Transport)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            retry: RetryPolicy::default(),
        })
    }

    /// Client for the configured instance. Fails when the URL or
    /// credentials are missing.
    pub fn from_config(config: &JiraConfig) -> Result<Self, ConfigError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingJiraSetting("jira.url"))?;
        let auth = JiraAuth::from_config(config)?;
        Self::new(url, auth, Duration::from_secs(config.timeout_secs)).map_err(|e| {
            ConfigError::InvalidValue {
                field: "jira",
                reason: e.to_string(),
            }
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn issue_endpoint(&self, key: &str) -> String {
        format!("{}/rest/api/2/issue/{}", self.base_url, key)
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, self.auth.header_value())
            .header(ACCEPT, "application/json")
    }

    /// Send one request, mapping non-success statuses to errors.
    ///
    /// `allow_not_found` turns a 404 into `Ok(None)`.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder,
        allow_not_found: bool,
    ) -> Result<Option<Response>, JiraError> {
        retry_with_backoff(&self.retry, || {
            let request = self.authorized(build());
            async move {
                let response = request.send().await.map_err(JiraError::Transport)?;

                let status = response.status();
                if allow_not_found && status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !status.is_success() {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<unable to read response>".to_string());
                    return Err(JiraError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Ok(Some(response))
            }
        })
        .await
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn get_issue(&self, key: &str) -> Result<Option<Issue>, JiraError> {
        let url = self.issue_endpoint(key);
        let Some(response) = self
            .send(|| self.http.get(&url).query(&[("fields", "summary,status,labels")]), true)
            .await?
        else {
            debug!("Issue {} not found", key);
            return Ok(None);
        };

        let payload: JiraIssueResponse = response.json().await.map_err(JiraError::Decode)?;
        Ok(Some(Issue {
            url: self.browse_url(&payload.key),
            key: payload.key,
            summary: payload.fields.summary.unwrap_or_default(),
            status: payload.fields.status.map(|s| s.name),
            labels: payload.fields.labels,
        }))
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<(), JiraError> {
        let url = format!("{}/comment", self.issue_endpoint(key));
        let request = JiraCommentRequest { body };
        self.send(|| self.http.post(&url).json(&request), false).await?;
        Ok(())
    }

    async fn add_labels(&self, key: &str, labels: &[String]) -> Result<(), JiraError> {
        if labels.is_empty() {
            return Ok(());
        }

        let url = self.issue_endpoint(key);
        let request = JiraLabelUpdate::adding(labels);
        self.send(|| self.http.put(&url).json(&request), false).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JiraCommentRequest<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct JiraLabelUpdate<'a> {
    update: JiraLabelOperations<'a>,
}

#[derive(Serialize)]
struct JiraLabelOperations<'a> {
    labels: Vec<JiraLabelAdd<'a>>,
}

#[derive(Serialize)]
struct JiraLabelAdd<'a> {
    add: &'a str,
}

impl<'a> JiraLabelUpdate<'a> {
    fn adding(labels: &'a [String]) -> Self {
        Self {
            update: JiraLabelOperations {
                labels: labels.iter().map(|l| JiraLabelAdd { add: l }).collect(),
            },
        }
    }
}

#[derive(Deserialize)]
struct JiraIssueResponse {
    key: String,
    #[serde(default)]
    fields: JiraIssueFields,
}

#[derive(Deserialize, Default)]
struct JiraIssueFields {
    summary: Option<String>,
    status: Option<JiraStatus>,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct JiraStatus {
    name: String,
}
