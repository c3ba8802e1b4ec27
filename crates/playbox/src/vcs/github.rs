//! GitHub REST v3 client

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::GitHubConfig;
use crate::vcs::{
    Account, Commit, Credential, FileContent, RepoRef, Repository, SourceControl, VcsError,
    repository_name,
};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Repositories fetched per listing (the API maximum)
const REPOS_PER_PAGE: usize = 100;

/// Largest `per_page` the API honours; history is a single page
const MAX_HISTORY_PAGE: usize = 100;

/// [`SourceControl`] over the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    default_branch: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, VcsError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            default_branch: config.default_branch.clone(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base))
            .header(AUTHORIZATION, credential.bearer())
            .header(ACCEPT, GITHUB_ACCEPT)
    }

    fn contents_path(repo: &RepoRef, path: &str) -> String {
        format!(
            "/repos/{}/{}/contents/{}",
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            encode_path(path)
        )
    }

    fn branch<'a>(&'a self, repo: &'a RepoRef) -> &'a str {
        repo.branch_or(&self.default_branch)
    }
}

/// Percent-encode each segment of a repository path, keeping the slashes
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn an unsuccessful response into a [`VcsError`]
async fn check(response: Response) -> Result<Response, VcsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    debug!(status = status.as_u16(), %message, "GitHub request failed");
    Err(VcsError::from_status(
        status.as_u16(),
        remaining.as_deref(),
        message,
    ))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VcsError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| VcsError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct CommitPerson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Commit as embedded in a contents write/delete response
#[derive(Deserialize)]
struct WriteCommit {
    sha: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<CommitPerson>,
}

#[derive(Deserialize)]
struct WriteResponse {
    commit: WriteCommit,
}

impl From<WriteCommit> for Commit {
    fn from(commit: WriteCommit) -> Self {
        let (author, date) = commit
            .author
            .map(|a| (a.name, a.date))
            .unwrap_or_default();
        Commit {
            sha: commit.sha,
            message: commit.message,
            author,
            date,
        }
    }
}

/// Entry of the commit listing endpoint
#[derive(Deserialize)]
struct HistoryEntry {
    sha: String,
    commit: HistoryDetail,
}

#[derive(Deserialize)]
struct HistoryDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<CommitPerson>,
}

impl From<HistoryEntry> for Commit {
    fn from(entry: HistoryEntry) -> Self {
        WriteCommit {
            sha: entry.sha,
            message: entry.commit.message,
            author: entry.commit.author,
        }
        .into()
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    #[instrument(skip_all)]
    async fn authenticate(&self, credential: &Credential) -> Result<Account, VcsError> {
        let response = self
            .request(Method::GET, "/user", credential)
            .send()
            .await?;
        let account: Account = decode(check(response).await?).await?;
        debug!(login = %account.login, "authenticated");
        Ok(account)
    }

    #[instrument(skip_all)]
    async fn list_repositories(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Repository>, VcsError> {
        let response = self
            .request(Method::GET, "/user/repos", credential)
            .query(&[
                ("sort", "updated".to_owned()),
                ("per_page", REPOS_PER_PAGE.to_string()),
            ])
            .send()
            .await?;
        decode(check(response).await?).await
    }

    #[instrument(skip(self, credential))]
    async fn create_repository(
        &self,
        credential: &Credential,
        name: &str,
        description: Option<&str>,
    ) -> Result<Repository, VcsError> {
        let name = repository_name(name)?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let response = self
            .request(Method::POST, "/user/repos", credential)
            .json(&json!({
                "name": name,
                "description": description,
                "private": false,
                "auto_init": true,
            }))
            .send()
            .await?;
        decode(check(response).await?).await
    }

    #[instrument(skip(self, credential), fields(repo = %repo))]
    async fn read_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent, VcsError> {
        let response = self
            .request(Method::GET, &Self::contents_path(repo, path), credential)
            .query(&[("ref", self.branch(repo))])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(VcsError::NotFound(path.to_owned()));
        }

        let contents: ContentsResponse = decode(check(response).await?).await?;
        let Some(encoded) = contents.content else {
            return Err(VcsError::Decode(format!("'{path}' is not a file")));
        };

        // The API wraps base64 at 60 columns
        let compact: String = encoded.split_whitespace().collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| VcsError::Decode(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| VcsError::Decode(e.to_string()))?;

        Ok(FileContent {
            text,
            version: contents.sha,
        })
    }

    #[instrument(skip(self, credential, text), fields(repo = %repo))]
    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        text: &str,
        message: &str,
        prior_version: Option<&str>,
    ) -> Result<Commit, VcsError> {
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(text),
            "branch": self.branch(repo),
        });
        if let Some(sha) = prior_version {
            body["sha"] = json!(sha);
        }

        let response = self
            .request(Method::PUT, &Self::contents_path(repo, path), credential)
            .json(&body)
            .send()
            .await?;
        let written: WriteResponse = decode(check(response).await?).await?;
        debug!(sha = %written.commit.sha, "file committed");
        Ok(written.commit.into())
    }

    #[instrument(skip(self, credential), fields(repo = %repo))]
    async fn list_history(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, VcsError> {
        let mut query = vec![
            ("sha", self.branch(repo).to_owned()),
            ("per_page", limit.clamp(1, MAX_HISTORY_PAGE).to_string()),
        ];
        if !path.is_empty() {
            query.push(("path", path.to_owned()));
        }

        let response = self
            .request(
                Method::GET,
                &format!(
                    "/repos/{}/{}/commits",
                    urlencoding::encode(&repo.owner),
                    urlencoding::encode(&repo.name)
                ),
                credential,
            )
            .query(&query)
            .send()
            .await?;

        // New files and empty repositories have no history yet
        match check(response).await {
            Ok(response) => {
                let entries: Vec<HistoryEntry> = decode(response).await?;
                Ok(entries.into_iter().take(limit).map(Commit::from).collect())
            }
            Err(VcsError::NotFound(_) | VcsError::Conflict(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, credential), fields(repo = %repo))]
    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        message: &str,
        version: &str,
    ) -> Result<Commit, VcsError> {
        let response = self
            .request(Method::DELETE, &Self::contents_path(repo, path), credential)
            .json(&json!({
                "message": message,
                "sha": version,
                "branch": self.branch(repo),
            }))
            .send()
            .await?;
        let deleted: WriteResponse = decode(check(response).await?).await?;
        Ok(deleted.commit.into())
    }
}
