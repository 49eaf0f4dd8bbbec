//! GitHub provider - REST API client
//!
//! Implements [`GitHubApi`] with `reqwest`. Requests are retried on throttling
//! and server errors; everything else is classified into the result types the
//! remediation actions understand.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::state::{ReleaseInfo, RepoContext};

use super::{GitHubApi, RefUpdateResult, ReleaseResult};

/// Maximum attempts per request (first try included)
const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled on each further attempt
const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);

const PER_PAGE: usize = 100;

/// Annotated tags can point at other tag objects
const MAX_TAG_DEPTH: usize = 5;

/// Raw response kept for classification
#[derive(Debug)]
struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The `message` field of a GitHub error payload, or the raw body
    fn message(&self) -> String {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| self.body.clone())
    }
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GitTag {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct ApiRelease {
    id: u64,
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    immutable: bool,
    #[serde(default)]
    target_commitish: Option<String>,
}

impl ApiRelease {
    fn into_release_info(self, latest_id: Option<u64>) -> ReleaseInfo {
        ReleaseInfo {
            is_latest: latest_id == Some(self.id),
            tag_name: self.tag_name,
            id: self.id,
            is_draft: self.draft,
            is_prerelease: self.prerelease,
            is_immutable: self.immutable,
            target_commitish: self.target_commitish,
            is_ignored: false,
        }
        .normalized()
    }
}

/// GitHub REST API client bound to one repository
pub struct GitHubClient {
    http: reqwest::Client,
    context: RepoContext,
    retry_delay: Duration,
}

impl GitHubClient {
    /// Create a client for the repository in `context`
    pub fn new(context: RepoContext) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static("2022-11-28"),
        );

        if let Some(token) = &context.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ProviderError::InvalidResponse("token contains invalid characters".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("versionlens/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            context,
            retry_delay: BASE_RETRY_DELAY,
        })
    }

    pub fn context(&self) -> &RepoContext {
        &self.context
    }

    /// URL of a path below `repos/{owner}/{repo}/`
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.context.api_url, self.context.owner, self.context.repo, path
        )
    }

    /// Send a request, retrying 429 and 5xx responses
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ProviderError> {
        let url = self.repo_url(path);

        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(method = %method, path, attempt, "GitHub API request");

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    warn!(method = %method, path, error = %e, "Request failed, retrying");
                    tokio::time::sleep(self.backoff(attempt, None)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if is_retryable(status) && attempt < MAX_ATTEMPTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                warn!(method = %method, path, status = status.as_u16(), "Retryable response");
                tokio::time::sleep(self.backoff(attempt, retry_after)).await;
                continue;
            }

            let body = response.text().await?;
            if is_retryable(status) {
                break;
            }
            return Ok(ApiResponse { status, body });
        }

        Err(ProviderError::RetriesExhausted {
            method: method.to_string(),
            path: path.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => Duration::from_secs(secs.min(60)),
            None => self.retry_delay * 2u32.pow(attempt.saturating_sub(1)),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let response = self.send(Method::GET, path, None).await?;
        if !response.is_success() {
            return Err(status_error("GET", path, &response));
        }
        parse_body(&response.body)
    }

    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ProviderError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let page_path = format!("{}?per_page={}&page={}", path, PER_PAGE, page);
            let batch: Vec<T> = self.get_json(&page_path).await?;
            let count = batch.len();
            items.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    async fn list_refs(&self, namespace: &str) -> Result<Vec<GitRef>, ProviderError> {
        let path = format!("git/matching-refs/{}", namespace);
        let response = self.send(Method::GET, &path, None).await?;
        if response.status == StatusCode::NOT_FOUND || response.status == StatusCode::CONFLICT {
            // empty repository
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(status_error("GET", &path, &response));
        }
        parse_body(&response.body)
    }

    /// Follow annotated tag objects down to the commit
    async fn peel_tag(&self, object: GitObject) -> Result<String, ProviderError> {
        let mut current = object;
        for _ in 0..MAX_TAG_DEPTH {
            if current.kind != "tag" {
                return Ok(current.sha);
            }
            let tag: GitTag = self.get_json(&format!("git/tags/{}", current.sha)).await?;
            current = tag.object;
        }
        Err(ProviderError::InvalidResponse(format!(
            "tag chain deeper than {} at {}",
            MAX_TAG_DEPTH, current.sha
        )))
    }

    async fn latest_release_id(&self) -> Result<Option<u64>, ProviderError> {
        let response = self.send(Method::GET, "releases/latest", None).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(status_error("GET", "releases/latest", &response));
        }
        let release: ApiRelease = parse_body(&response.body)?;
        Ok(Some(release.id))
    }

    /// Path of a ref below `git/`, e.g. `git/refs/tags/v1`
    fn ref_path(ref_name: &str) -> String {
        format!("git/{}", ref_name)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

fn status_error(method: &str, path: &str, response: &ApiResponse) -> ProviderError {
    ProviderError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status: response.status.as_u16(),
        message: response.message(),
    }
}

/// Ref updates touching workflow files need the `workflows` permission,
/// which the default Actions token never has.
fn classify_ref_update(response: &ApiResponse) -> RefUpdateResult {
    if response.is_success() {
        return RefUpdateResult::ok();
    }

    let forbidden = matches!(
        response.status,
        StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::NOT_FOUND
    );
    if forbidden && response.message().to_lowercase().contains("workflow") {
        return RefUpdateResult::manual_fix();
    }

    RefUpdateResult::failed()
}

/// HTTP 422 on a release mutation means the tag is locked by an immutable
/// release that was deleted.
fn classify_release(response: &ApiResponse) -> ReleaseResult {
    if response.is_success() {
        return ReleaseResult::ok();
    }
    if response.status == StatusCode::UNPROCESSABLE_ENTITY {
        return ReleaseResult::unfixable();
    }
    ReleaseResult::failed()
}

fn make_latest_value(make_latest: Option<bool>) -> Option<&'static str> {
    make_latest.map(|latest| if latest { "true" } else { "false" })
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_tags(&self) -> Result<Vec<(String, String)>, ProviderError> {
        let mut tags = Vec::new();
        for git_ref in self.list_refs("tags").await? {
            let name = git_ref
                .ref_name
                .trim_start_matches("refs/tags/")
                .to_string();
            let sha = self.peel_tag(git_ref.object).await?;
            tags.push((name, sha));
        }
        Ok(tags)
    }

    async fn list_branches(&self) -> Result<Vec<(String, String)>, ProviderError> {
        Ok(self
            .list_refs("heads")
            .await?
            .into_iter()
            .map(|r| {
                (
                    r.ref_name.trim_start_matches("refs/heads/").to_string(),
                    r.object.sha,
                )
            })
            .collect())
    }

    async fn list_releases(&self) -> Result<Vec<ReleaseInfo>, ProviderError> {
        let releases: Vec<ApiRelease> = self.get_paginated("releases").await?;
        let latest_id = self.latest_release_id().await?;
        Ok(releases
            .into_iter()
            .map(|r| r.into_release_info(latest_id))
            .collect())
    }

    async fn create_or_move_ref(
        &self,
        ref_name: &str,
        sha: &str,
        force: bool,
    ) -> Result<RefUpdateResult, ProviderError> {
        let body = json!({ "ref": ref_name, "sha": sha });
        let response = self.send(Method::POST, "git/refs", Some(&body)).await?;

        let already_exists = response.status == StatusCode::UNPROCESSABLE_ENTITY
            && response.message().to_lowercase().contains("already exists");

        if already_exists && force {
            let body = json!({ "sha": sha, "force": true });
            let response = self
                .send(Method::PATCH, &Self::ref_path(ref_name), Some(&body))
                .await?;
            let result = classify_ref_update(&response);
            if !result.success {
                warn!(ref_name, status = response.status.as_u16(), message = %response.message(), "Failed to move ref");
            }
            return Ok(result);
        }

        let result = classify_ref_update(&response);
        if !result.success {
            warn!(ref_name, status = response.status.as_u16(), message = %response.message(), "Failed to create ref");
        }
        Ok(result)
    }

    async fn delete_ref(&self, ref_name: &str) -> Result<bool, ProviderError> {
        let response = self
            .send(Method::DELETE, &Self::ref_path(ref_name), None)
            .await?;
        if !response.is_success() {
            warn!(ref_name, status = response.status.as_u16(), message = %response.message(), "Failed to delete ref");
        }
        Ok(response.is_success())
    }

    async fn create_release(
        &self,
        tag_name: &str,
        draft: bool,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError> {
        let mut body = json!({
            "tag_name": tag_name,
            "name": tag_name,
            "draft": draft,
            "generate_release_notes": true,
        });
        if let Some(latest) = make_latest_value(make_latest) {
            body["make_latest"] = json!(latest);
        }

        let response = self.send(Method::POST, "releases", Some(&body)).await?;
        if response.is_success() {
            let created: ApiRelease = parse_body(&response.body)?;
            return Ok(ReleaseResult::created(created.id));
        }

        warn!(tag_name, status = response.status.as_u16(), message = %response.message(), "Failed to create release");
        Ok(classify_release(&response))
    }

    async fn publish_release(
        &self,
        tag_name: &str,
        release_id: u64,
        make_latest: Option<bool>,
    ) -> Result<ReleaseResult, ProviderError> {
        let mut body = json!({ "draft": false });
        if let Some(latest) = make_latest_value(make_latest) {
            body["make_latest"] = json!(latest);
        }

        let path = format!("releases/{}", release_id);
        let response = self.send(Method::PATCH, &path, Some(&body)).await?;
        if !response.is_success() {
            warn!(tag_name, release_id, status = response.status.as_u16(), message = %response.message(), "Failed to publish release");
        }
        Ok(classify_release(&response))
    }

    async fn revert_release_to_draft(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<bool, ProviderError> {
        let path = format!("releases/{}", release_id);
        let body = json!({ "draft": true });
        let response = self.send(Method::PATCH, &path, Some(&body)).await?;
        if !response.is_success() {
            warn!(tag_name, release_id, status = response.status.as_u16(), message = %response.message(), "Failed to revert release to draft");
        }
        Ok(response.is_success())
    }

    async fn delete_release(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<bool, ProviderError> {
        let path = format!("releases/{}", release_id);
        let response = self.send(Method::DELETE, &path, None).await?;
        if !response.is_success() {
            warn!(tag_name, release_id, status = response.status.as_u16(), message = %response.message(), "Failed to delete release");
        }
        Ok(response.is_success())
    }

    async fn set_release_latest(
        &self,
        tag_name: &str,
        release_id: u64,
    ) -> Result<ReleaseResult, ProviderError> {
        let path = format!("releases/{}", release_id);
        let body = json!({ "make_latest": "true" });
        let response = self.send(Method::PATCH, &path, Some(&body)).await?;
        if !response.is_success() {
            warn!(tag_name, release_id, status = response.status.as_u16(), message = %response.message(), "Failed to mark release as latest");
        }
        Ok(classify_release(&response))
    }

    async fn is_release_immutable(&self, tag: &str) -> Result<bool, ProviderError> {
        let path = format!("releases/tags/{}", tag);
        let response = self.send(Method::GET, &path, None).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.is_success() {
            return Err(status_error("GET", &path, &response));
        }
        let release: ApiRelease = parse_body(&response.body)?;
        Ok(release.immutable && !release.draft)
    }
}
