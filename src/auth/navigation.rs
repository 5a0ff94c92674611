//! Navigation port
//!
//! Everything the flow needs from a browser window: the current address,
//! full-page navigation, replacing the address in place, and telling the
//! user something went wrong.

use std::sync::Mutex;
use url::Url;
use crate::ui;

/// Browser-like navigation surface
pub trait Navigator: Send + Sync {
    /// The address currently shown
    fn current_url(&self) -> Url;

    /// Full navigation; the current page is abandoned
    fn assign(&self, url: &Url);

    /// Replace the shown address without reloading
    fn replace_url(&self, url: &Url);

    /// Show a blocking message to the user
    fn alert(&self, message: &str);
}

/// Navigator that only records what it was asked to do
#[derive(Debug)]
pub struct InMemoryNavigator {
    state: Mutex<NavigatorState>,
}

#[derive(Debug)]
struct NavigatorState {
    current: Url,
    assigned: Vec<Url>,
    alerts: Vec<String>,
}

impl InMemoryNavigator {
    pub fn new(current: Url) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                current,
                assigned: Vec::new(),
                alerts: Vec::new(),
            }),
        }
    }

    /// Navigations requested through `assign`, oldest first
    pub fn assigned(&self) -> Vec<Url> {
        self.lock().assigned.clone()
    }

    /// Messages passed to `alert`, oldest first
    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavigatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for InMemoryNavigator {
    fn current_url(&self) -> Url {
        self.lock().current.clone()
    }

    fn assign(&self, url: &Url) {
        self.lock().assigned.push(url.clone());
    }

    fn replace_url(&self, url: &Url) {
        self.lock().current = url.clone();
    }

    fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_string());
    }
}

/// Navigator for a terminal session
///
/// Navigation opens the system browser; alerts are printed.
#[derive(Debug)]
pub struct SystemNavigator {
    current: Mutex<Url>,
    open_browser: bool,
}

impl SystemNavigator {
    pub fn new(current: Url, open_browser: bool) -> Self {
        Self {
            current: Mutex::new(current),
            open_browser,
        }
    }
}

impl Navigator for SystemNavigator {
    fn current_url(&self) -> Url {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn assign(&self, url: &Url) {
        println!("\nIf the browser doesn't open, visit this URL:\n{}\n", url);

        if self.open_browser {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }
    }

    fn replace_url(&self, url: &Url) {
        tracing::debug!("Address is now {}", url);
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = url.clone();
    }

    fn alert(&self, message: &str) {
        ui::print_error(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_navigator_records_calls() {
        let nav = InMemoryNavigator::new(Url::parse("http://localhost/?code=1#auth").unwrap());

        nav.replace_url(&Url::parse("http://localhost/#auth").unwrap());
        nav.assign(&Url::parse("https://github.com/login/oauth/authorize").unwrap());
        nav.alert("denied");

        assert_eq!(nav.current_url().as_str(), "http://localhost/#auth");
        assert_eq!(nav.assigned().len(), 1);
        assert_eq!(nav.alerts(), vec!["denied".to_string()]);
    }

    #[test]
    fn test_system_navigator_tracks_address() {
        let nav = SystemNavigator::new(Url::parse("http://127.0.0.1:8085/?code=x").unwrap(), false);
        nav.replace_url(&Url::parse("http://127.0.0.1:8085/").unwrap());
        assert_eq!(nav.current_url().as_str(), "http://127.0.0.1:8085/");
    }
}
