//! User profiles produced by the callback exchange

use serde::{Deserialize, Serialize};

/// Display name given to profiles synthesised without the provider
pub const DEMO_DISPLAY_NAME: &str = "GitHub Demo User";

/// A signed-in user, immutable once built
///
/// Field names on the wire follow GitHub's user payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,

    #[serde(rename = "login")]
    pub login_name: String,

    #[serde(rename = "name")]
    pub display_name: String,

    pub email: String,

    pub avatar_url: String,
}

/// Where a profile came from
///
/// Stored with a `source` tag next to the user fields so a reload still
/// knows whether it is looking at real provider data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Profile {
    /// Fetched from the provider's user-info endpoint
    Real(UserProfile),
    /// Synthesised locally because no real exchange was possible
    Demo(UserProfile),
}

impl Profile {
    pub fn user(&self) -> &UserProfile {
        match self {
            Profile::Real(user) | Profile::Demo(user) => user,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Profile::Demo(_))
    }

    /// Deterministic stand-in profile derived from an authorization code
    ///
    /// Only alphanumeric characters of the code are used, so any code,
    /// however malformed, produces a usable identity.
    pub fn demo_from_code(code: &str) -> Self {
        let short = code_prefix(code, 8);
        let shorter = code_prefix(code, 6);

        Profile::Demo(UserProfile {
            id: format!("demo_{}", short),
            login_name: format!("user_{}", short),
            display_name: DEMO_DISPLAY_NAME.to_string(),
            email: format!("demo_{}@github.com", shorter),
            avatar_url: format!("https://github.com/identicons/{}.png", short),
        })
    }
}

fn code_prefix(code: &str, len: usize) -> String {
    let prefix: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(len)
        .collect();

    if prefix.is_empty() {
        "guest".to_string()
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn octocat() -> UserProfile {
        UserProfile {
            id: "583231".to_string(),
            login_name: "octocat".to_string(),
            display_name: "The Octocat".to_string(),
            email: "octocat@github.com".to_string(),
            avatar_url: "https://avatars.githubusercontent.com/u/583231".to_string(),
        }
    }

    #[test]
    fn test_demo_profile_is_deterministic() {
        let a = Profile::demo_from_code("abc123");
        let b = Profile::demo_from_code("abc123");
        assert_eq!(a, b);
        assert!(a.is_demo());
        assert_eq!(a.user().login_name, "user_abc123");
        assert_eq!(a.user().email, "demo_abc123@github.com");
    }

    #[test]
    fn test_demo_profile_truncates_long_codes() {
        let profile = Profile::demo_from_code("0123456789abcdef");
        assert_eq!(profile.user().login_name, "user_01234567");
        assert_eq!(profile.user().email, "demo_012345@github.com");
        assert_eq!(
            profile.user().avatar_url,
            "https://github.com/identicons/01234567.png"
        );
    }

    #[test]
    fn test_demo_profile_from_malformed_code() {
        let profile = Profile::demo_from_code("<>%é/");
        assert_eq!(profile.user().login_name, "user_guest");

        let profile = Profile::demo_from_code("a-b c");
        assert_eq!(profile.user().login_name, "user_abc");
    }

    #[test]
    fn test_tagged_serialization() {
        let json = serde_json::to_value(Profile::Real(octocat())).unwrap();
        assert_eq!(json["source"], "real");
        assert_eq!(json["login"], "octocat");
        assert_eq!(json["name"], "The Octocat");

        let parsed: Profile = serde_json::from_value(json).unwrap();
        assert!(!parsed.is_demo());
        assert_eq!(parsed.user(), &octocat());
    }
}
