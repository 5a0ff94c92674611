//! Authorization redirect
//!
//! Builds the provider authorization URL and hands it to the navigator.

use rand::Rng;
use url::Url;
use crate::Result;
use crate::error::Error;
use super::navigation::Navigator;

/// Length of the anti-forgery state token
const STATE_LENGTH: usize = 32;

/// An authorization URL and the state token embedded in it
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Builds authorization requests against one provider endpoint
#[derive(Debug, Clone)]
pub struct OAuthRedirector {
    authorize_url: String,
}

impl OAuthRedirector {
    pub fn new(authorize_url: impl Into<String>) -> Self {
        Self {
            authorize_url: authorize_url.into(),
        }
    }

    /// Build the authorization URL with a fresh state token
    ///
    /// Fails with `ConfigurationMissing` when the client id is empty.
    pub fn build_authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> Result<AuthorizationRequest> {
        if client_id.trim().is_empty() {
            return Err(Error::ConfigurationMissing(
                "GitHub client id is not configured".to_string(),
            ));
        }

        let state = generate_state();
        let mut url = Url::parse(&self.authorize_url)?;

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", scope)
            .append_pair("state", &state);

        Ok(AuthorizationRequest { url, state })
    }

    /// Navigate away to the provider. Nothing runs on this page afterwards.
    pub fn redirect(&self, navigator: &dyn Navigator, url: &Url) {
        tracing::info!("Redirecting to GitHub OAuth: {}", url);
        navigator.assign(url);
    }
}

/// Generate a random state string for CSRF protection
fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    (0..STATE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}
