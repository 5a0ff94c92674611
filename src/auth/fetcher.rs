//! Profile lookup against the provider

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::Result;
use crate::error::Error;
use super::profile::UserProfile;

/// Resolves an authorization code to a user profile
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch(&self, code: &str) -> Result<UserProfile>;
}

/// GitHub user payload, only the fields we keep
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: String,
}

impl From<GitHubUser> for UserProfile {
    fn from(user: GitHubUser) -> Self {
        let display_name = user
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.login.clone());
        let email = user
            .email
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| format!("{}@github.com", user.login));

        UserProfile {
            id: user.id.to_string(),
            login_name: user.login,
            display_name,
            email,
            avatar_url: user.avatar_url,
        }
    }
}

/// Fetches the profile from GitHub's public user endpoint
///
/// No token is sent: a real code-for-token exchange needs the client
/// secret, which only a backend may hold. Without one, the endpoint
/// normally rejects the call and the caller falls back to a demo profile.
#[derive(Clone)]
pub struct GitHubProfileFetcher {
    http_client: Client,
    user_info_url: String,
}

impl GitHubProfileFetcher {
    pub fn new(user_info_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("octoauth/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            user_info_url: user_info_url.into(),
        })
    }
}

#[async_trait]
impl ProfileFetcher for GitHubProfileFetcher {
    async fn fetch(&self, _code: &str) -> Result<UserProfile> {
        let response = self.http_client
            .get(&self.user_info_url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Exchange(format!(
                "GitHub user endpoint returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let user: GitHubUser = serde_json::from_str(&body)?;
        Ok(user.into())
    }
}
