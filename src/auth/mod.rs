//! GitHub OAuth session flow
//!
//! This module provides:
//! - Session persistence over a pluggable key/value storage
//! - Authorization URL building with an anti-forgery state token
//! - Callback inspection, profile exchange and address cleanup
//! - The session controller tying these together behind a navigation port
//! - A one-shot loopback listener for driving the flow from a terminal

mod callback;
mod callback_server;
mod controller;
mod fetcher;
mod navigation;
mod profile;
mod redirector;
mod storage;
mod store;

pub use callback::{cleaned_url, verify_state, Callback, CallbackHandler};
pub use callback_server::{bind_loopback, loopback_url, wait_for_redirect, DEFAULT_PORT};
pub use controller::{AuthSessionController, AuthSnapshot, AuthState};
pub use fetcher::{GitHubProfileFetcher, ProfileFetcher};
pub use navigation::{InMemoryNavigator, Navigator, SystemNavigator};
pub use profile::{Profile, UserProfile, DEMO_DISPLAY_NAME};
pub use redirector::{AuthorizationRequest, OAuthRedirector};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{Session, SessionStore, PENDING_STATE_KEY, TOKEN_KEY, USER_KEY};
