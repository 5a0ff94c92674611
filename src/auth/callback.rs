//! Provider callback handling
//!
//! Recognises an authorization code or error in the current address, turns
//! a code into a profile, and strips the OAuth parameters from the address
//! afterwards.

use std::sync::Arc;
use std::time::Duration;
use url::{form_urlencoded, Url};
use crate::Result;
use crate::error::Error;
use super::fetcher::ProfileFetcher;
use super::navigation::Navigator;
use super::profile::Profile;

/// Query parameters owned by the OAuth round trip
const OAUTH_PARAMS: &[&str] = &["code", "state", "error", "error_description", "error_uri"];

/// What the provider sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Consent given; the code is ready to exchange
    Code { code: String, state: Option<String> },
    /// The provider refused; nothing to exchange
    Error {
        error: String,
        description: Option<String>,
        state: Option<String>,
    },
}

impl Callback {
    pub fn state(&self) -> Option<&str> {
        match self {
            Callback::Code { state, .. } | Callback::Error { state, .. } => state.as_deref(),
        }
    }
}

/// Inspects callback addresses and exchanges codes for profiles
#[derive(Clone)]
pub struct CallbackHandler {
    fetcher: Arc<dyn ProfileFetcher>,
    timeout: Duration,
}

impl CallbackHandler {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Look for an OAuth callback in `url`
    ///
    /// An `error` wins over a `code`. Empty values count as absent.
    pub fn inspect(&self, url: &Url) -> Option<Callback> {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Some(Callback::Error { error, description, state });
        }

        code.map(|code| Callback::Code { code, state })
    }

    /// Turn a code into a profile
    ///
    /// Never fails: a rejected, unreachable, slow or unparsable lookup
    /// yields a demo profile derived from the code.
    pub async fn exchange(&self, code: &str) -> Profile {
        let fetched = match tokio::time::timeout(self.timeout, self.fetcher.fetch(code)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Exchange(format!(
                "no answer within {}s",
                self.timeout.as_secs_f32()
            ))),
        };

        match fetched {
            Ok(user) => {
                tracing::info!("Fetched GitHub profile for {}", user.login_name);
                Profile::Real(user)
            }
            Err(e) => {
                tracing::warn!("Could not fetch real profile ({}), using demo data", e);
                Profile::demo_from_code(code)
            }
        }
    }

    /// Remove the OAuth parameters from the shown address without reloading
    pub fn cleanup(&self, navigator: &dyn Navigator) {
        let current = navigator.current_url();
        let cleaned = cleaned_url(&current);
        if cleaned != current {
            tracing::debug!("Cleaning callback parameters from {}", current);
            navigator.replace_url(&cleaned);
        }
    }
}

/// Check a callback's state against the one sent with the request
///
/// With no remembered state there is nothing to compare against and the
/// callback is accepted.
pub fn verify_state(expected: Option<&str>, received: Option<&str>) -> Result<()> {
    match expected {
        None => {
            tracing::warn!("No pending sign-in state, accepting callback unverified");
            Ok(())
        }
        Some(expected) if received == Some(expected) => Ok(()),
        Some(expected) => Err(Error::StateMismatch {
            expected: expected.to_string(),
            received: received.map(str::to_string),
        }),
    }
}

/// `url` without OAuth query parameters
///
/// Other parameters are kept byte for byte, as is the fragment.
pub fn cleaned_url(url: &Url) -> Url {
    let kept: Vec<&str> = url
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|segment| !segment.is_empty() && !is_oauth_param(segment))
        .collect();

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.set_query(Some(&kept.join("&")));
    }
    cleaned
}

fn is_oauth_param(segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| OAUTH_PARAMS.contains(&&*key))
        .unwrap_or(false)
}
