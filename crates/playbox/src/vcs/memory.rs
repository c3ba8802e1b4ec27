//! In-process [`SourceControl`] for tests and offline use

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::vcs::{
    Account, Commit, Credential, FileContent, RepoRef, Repository, SourceControl, VcsError,
    repository_name,
};

#[derive(Debug, Default)]
struct StoredRepo {
    description: Option<String>,
    /// path → (text, version)
    files: BTreeMap<String, (String, String)>,
    /// Oldest first
    history: Vec<(String, Commit)>,
}

/// A single account whose repositories live in memory
#[derive(Debug)]
pub struct MemoryVcs {
    login: String,
    token: String,
    repos: Mutex<BTreeMap<String, StoredRepo>>,
}

impl MemoryVcs {
    /// Create an account that accepts exactly `token`
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            token: token.into(),
            repos: Mutex::new(BTreeMap::new()),
        }
    }

    fn check(&self, credential: &Credential) -> Result<(), VcsError> {
        if credential.token() == self.token {
            Ok(())
        } else {
            Err(VcsError::Unauthorized)
        }
    }

    fn repos(&self) -> MutexGuard<'_, BTreeMap<String, StoredRepo>> {
        self.repos.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn describe(&self, name: &str, repo: &StoredRepo) -> Repository {
        Repository {
            name: name.to_owned(),
            full_name: format!("{}/{name}", self.login),
            description: repo.description.clone(),
            private: false,
            default_branch: Some("main".to_owned()),
        }
    }

    fn with_repo<T>(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        f: impl FnOnce(&mut StoredRepo) -> Result<T, VcsError>,
    ) -> Result<T, VcsError> {
        self.check(credential)?;
        let mut repos = self.repos();
        match repos.get_mut(&repo.name) {
            Some(stored) if repo.owner == self.login => f(stored),
            _ => Err(VcsError::NotFound(repo.to_string())),
        }
    }

    fn commit(&self, message: &str) -> Commit {
        Commit {
            sha: Uuid::new_v4().simple().to_string(),
            message: message.to_owned(),
            author: Some(self.login.clone()),
            date: None,
        }
    }
}

fn new_version() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl SourceControl for MemoryVcs {
    async fn authenticate(&self, credential: &Credential) -> Result<Account, VcsError> {
        self.check(credential)?;
        Ok(Account {
            login: self.login.clone(),
            name: None,
            avatar_url: None,
        })
    }

    async fn list_repositories(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Repository>, VcsError> {
        self.check(credential)?;
        Ok(self
            .repos()
            .iter()
            .map(|(name, repo)| self.describe(name, repo))
            .collect())
    }

    async fn create_repository(
        &self,
        credential: &Credential,
        name: &str,
        description: Option<&str>,
    ) -> Result<Repository, VcsError> {
        self.check(credential)?;
        let name = repository_name(name)?;

        let mut repos = self.repos();
        if repos.contains_key(name) {
            return Err(VcsError::Conflict(format!(
                "repository '{name}' already exists"
            )));
        }

        let repo = StoredRepo {
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            ..Default::default()
        };
        let described = self.describe(name, &repo);
        repos.insert(name.to_owned(), repo);
        Ok(described)
    }

    async fn read_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
    ) -> Result<FileContent, VcsError> {
        self.with_repo(credential, repo, |stored| {
            stored
                .files
                .get(path)
                .map(|(text, version)| FileContent {
                    text: text.clone(),
                    version: version.clone(),
                })
                .ok_or_else(|| VcsError::NotFound(path.to_owned()))
        })
    }

    async fn write_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        text: &str,
        message: &str,
        prior_version: Option<&str>,
    ) -> Result<Commit, VcsError> {
        let commit = self.commit(message);
        self.with_repo(credential, repo, |stored| {
            let current = stored.files.get(path).map(|(_, version)| version.as_str());
            if current != prior_version {
                return Err(VcsError::Conflict(format!(
                    "'{path}' does not match the expected version"
                )));
            }

            stored
                .files
                .insert(path.to_owned(), (text.to_owned(), new_version()));
            stored.history.push((path.to_owned(), commit.clone()));
            Ok(commit)
        })
    }

    async fn list_history(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, VcsError> {
        let listed = self.with_repo(credential, repo, |stored| {
            Ok(stored
                .history
                .iter()
                .rev()
                .filter(|(touched, _)| path.is_empty() || touched == path)
                .take(limit)
                .map(|(_, commit)| commit.clone())
                .collect())
        });

        match listed {
            Err(VcsError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn delete_file(
        &self,
        credential: &Credential,
        repo: &RepoRef,
        path: &str,
        message: &str,
        version: &str,
    ) -> Result<Commit, VcsError> {
        let commit = self.commit(message);
        self.with_repo(credential, repo, |stored| {
            match stored.files.get(path) {
                None => return Err(VcsError::NotFound(path.to_owned())),
                Some((_, current)) if current != version => {
                    return Err(VcsError::Conflict(format!(
                        "'{path}' does not match the expected version"
                    )));
                }
                Some(_) => {}
            }

            stored.files.remove(path);
            stored.history.push((path.to_owned(), commit.clone()));
            Ok(commit)
        })
    }
}
