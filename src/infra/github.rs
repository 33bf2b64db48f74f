//! GitHub releases implementation of the `ReleaseSource` port.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::ReleaseSource;
use crate::domain::release::LATEST;
use crate::domain::{Release, ReleaseError};

/// Repository that publishes agent releases.
pub const DEFAULT_RELEASE_REPO: &str = "tricorefile/aurelia";

/// Public GitHub REST API base.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Environment override for the API base, used by mirrors and tests.
pub const API_URL_ENV: &str = "AURELIA_GITHUB_API_URL";

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

/// Reads release metadata from the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    api_base: String,
    repo: String,
    token: Option<String>,
}

impl GithubReleases {
    #[must_use]
    pub fn new(api_base: &str, repo: &str, token: Option<String>) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// API base from `AURELIA_GITHUB_API_URL`, token from `GITHUB_TOKEN`.
    #[must_use]
    pub fn from_env(repo: &str) -> Self {
        let api = std::env::var(API_URL_ENV).unwrap_or_else(|_| GITHUB_API_URL.to_string());
        Self::new(&api, repo, std::env::var("GITHUB_TOKEN").ok())
    }

    fn release_url(&self, tag: &str) -> String {
        if tag == LATEST {
            format!("{}/repos/{}/releases/latest", self.api_base, self.repo)
        } else {
            format!("{}/repos/{}/releases/tags/{tag}", self.api_base, self.repo)
        }
    }

    /// Blocking fetch; run on the blocking pool.
    fn fetch(&self, tag: &str) -> Result<Release> {
        let url = self.release_url(tag);
        tracing::debug!(%url, "fetching release metadata");

        let req = ureq::get(&url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", concat!("aurelia-fleet/", env!("CARGO_PKG_VERSION")));
        let req = match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        };

        let body = match req.call() {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| ReleaseError::Network(format!("reading response: {e}")))?,
            Err(ureq::Error::Status(404, _)) => {
                return Err(ReleaseError::TagNotFound(tag.to_string()).into());
            }
            Err(ureq::Error::Status(403 | 429, _)) => return Err(ReleaseError::RateLimited.into()),
            Err(ureq::Error::Status(code, _)) => {
                return Err(ReleaseError::Network(format!("HTTP {code} from {url}")).into());
            }
            Err(e) => return Err(ReleaseError::Network(e.to_string()).into()),
        };

        let release: GithubRelease = serde_json::from_str(&body)
            .map_err(|e| ReleaseError::InvalidResponse(e.to_string()))?;
        tracing::info!(tag = %release.tag_name, assets = release.assets.len(), "release resolved");
        Ok(Release {
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|a| (a.name, a.browser_download_url))
                .collect(),
        })
    }
}

impl ReleaseSource for GithubReleases {
    async fn get_release(&self, tag: &str) -> Result<Release> {
        let this = self.clone();
        let tag = tag.to_string();
        tokio::task::spawn_blocking(move || this.fetch(&tag))
            .await
            .context("release lookup task panicked")?
    }
}
