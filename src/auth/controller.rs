//! Session controller
//!
//! Owns the in-memory auth state and keeps it in line with storage. Views
//! read a snapshot or subscribe to changes, and drive the flow through
//! `sign_in` / `sign_out`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::watch;
use crate::Result;
use crate::config::AuthConfig;
use crate::error::Error;
use super::callback::{verify_state, Callback, CallbackHandler};
use super::fetcher::{GitHubProfileFetcher, ProfileFetcher};
use super::navigation::Navigator;
use super::profile::{Profile, UserProfile};
use super::redirector::OAuthRedirector;
use super::storage::Storage;
use super::store::SessionStore;

/// Where the controller is in the session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Persisted session not looked at yet
    Initializing,
    Unauthenticated,
    Authenticated(Profile),
    /// Sign-in attempted without a client id. Only a config change and a
    /// reload get out of here.
    ConfigMissing,
}

/// Read model handed to views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    state: AuthState,
    exchanging: bool,
}

impl AuthSnapshot {
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// True while initializing or while a code exchange is in flight
    pub fn is_loading(&self) -> bool {
        self.exchanging || self.state == AuthState::Initializing
    }

    pub fn is_exchanging(&self) -> bool {
        self.exchanging
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile().is_some()
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.state {
            AuthState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.profile().map(Profile::user)
    }
}

/// Drives the OAuth session flow for one page lifetime
pub struct AuthSessionController {
    config: AuthConfig,
    store: SessionStore,
    redirector: OAuthRedirector,
    callbacks: CallbackHandler,
    navigator: Arc<dyn Navigator>,
    snapshot: watch::Sender<AuthSnapshot>,
    disposed: AtomicBool,
}

impl AuthSessionController {
    pub fn new(
        config: AuthConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        fetcher: Arc<dyn ProfileFetcher>,
    ) -> Self {
        let (snapshot, _) = watch::channel(AuthSnapshot {
            state: AuthState::Initializing,
            exchanging: false,
        });

        Self {
            redirector: OAuthRedirector::new(config.authorize_url.clone()),
            callbacks: CallbackHandler::new(fetcher, config.exchange_timeout()),
            store: SessionStore::new(storage),
            config,
            navigator,
            snapshot,
            disposed: AtomicBool::new(false),
        }
    }

    /// Controller that looks profiles up on GitHub
    pub fn with_github(
        config: AuthConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let fetcher = GitHubProfileFetcher::new(config.user_info_url.clone(), config.exchange_timeout())?;
        Ok(Self::new(config, storage, navigator, Arc::new(fetcher)))
    }

    /// Current read model
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Follow read model changes
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    /// Restore the persisted session, then handle a callback in the address
    ///
    /// Restoring never waits on the network; only the code exchange does.
    pub async fn initialize(&self) {
        let restored = match self.store.load() {
            Some(profile) => {
                tracing::debug!("Restored session for {}", profile.user().login_name);
                AuthState::Authenticated(profile)
            }
            None => AuthState::Unauthenticated,
        };
        self.update(|snapshot| {
            if snapshot.state == AuthState::Initializing {
                snapshot.state = restored;
            }
        });

        let current = self.navigator.current_url();
        let Some(callback) = self.callbacks.inspect(&current) else {
            return;
        };

        let expected = self.store.take_pending_state();

        match callback {
            Callback::Error { error, description, .. } => {
                self.reject(Error::Provider { error, description });
            }
            Callback::Code { code, state } => {
                if self.config.verify_state {
                    if let Err(err) = verify_state(expected.as_deref(), state.as_deref()) {
                        self.reject(err);
                        return;
                    }
                }
                self.complete_exchange(&code).await;
            }
        }
    }

    /// Send the user to the provider
    ///
    /// Without a client id this moves to `ConfigMissing` and stays put.
    /// Already signed-in users are left alone.
    pub fn sign_in(&self) -> Result<()> {
        if self.snapshot.borrow().is_authenticated() {
            tracing::info!("Already signed in, ignoring sign-in");
            return Ok(());
        }

        let Some(client_id) = self.config.client_id() else {
            tracing::error!("GitHub client id not configured, refusing to redirect");
            self.update(|snapshot| snapshot.state = AuthState::ConfigMissing);
            return Err(Error::ConfigurationMissing(
                "set GITHUB_CLIENT_ID or client_id in the config file".to_string(),
            ));
        };

        let redirect_uri = self.config.redirect_uri_for(&self.navigator.current_url());
        let request = self.redirector
            .build_authorization_url(client_id, &redirect_uri, &self.config.scope)?;

        if self.config.verify_state {
            self.store.save_pending_state(&request.state)?;
        }

        self.redirector.redirect(self.navigator.as_ref(), &request.url);
        Ok(())
    }

    /// Drop the session from storage and memory. Safe to repeat.
    ///
    /// Memory is cleared even when storage refuses; a half-cleared store
    /// reads back as no session.
    pub fn sign_out(&self) -> Result<()> {
        let cleared = self.store.clear();
        self.update(|snapshot| {
            if matches!(snapshot.state, AuthState::Authenticated(_)) {
                snapshot.state = AuthState::Unauthenticated;
            }
        });

        match &cleared {
            Ok(()) => tracing::info!("User signed out"),
            Err(e) => tracing::error!("Signed out, but storage could not be cleared: {}", e),
        }
        cleared
    }

    /// Stop applying results; an exchange still in flight is discarded
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    async fn complete_exchange(&self, code: &str) {
        self.update(|snapshot| snapshot.exchanging = true);

        let profile = self.callbacks.exchange(code).await;

        if self.is_disposed() {
            tracing::debug!("Controller disposed, discarding exchanged profile");
            return;
        }

        let token = format!("demo-token-{}", Utc::now().timestamp_millis());
        match self.store.save(&profile, &token) {
            Ok(()) => {
                tracing::info!("User authenticated: {}", profile.user().login_name);
                self.update(|snapshot| {
                    snapshot.state = AuthState::Authenticated(profile);
                    snapshot.exchanging = false;
                });
            }
            Err(e) => {
                // The store has dropped both keys, including any restored session
                tracing::error!("Failed to persist session: {}", e);
                self.update(|snapshot| {
                    snapshot.state = AuthState::Unauthenticated;
                    snapshot.exchanging = false;
                });
                self.report(&e);
            }
        }

        self.callbacks.cleanup(self.navigator.as_ref());
    }

    fn reject(&self, err: Error) {
        if self.is_disposed() {
            tracing::error!("GitHub OAuth error: {}", err);
            return;
        }
        self.report(&err);
        self.callbacks.cleanup(self.navigator.as_ref());
    }

    /// Alert for errors meant for the user, log the rest
    fn report(&self, err: &Error) {
        if err.is_user_visible() {
            tracing::error!("GitHub OAuth error: {}", err);
            self.navigator.alert(&err.to_string());
        } else {
            tracing::warn!("Absorbed auth error: {}", err);
        }
    }

    fn update(&self, modify: impl FnOnce(&mut AuthSnapshot)) {
        if !self.is_disposed() {
            self.snapshot.send_modify(modify);
        }
    }
}
