//! octoauth CLI entry point

use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use anyhow::Result;
use url::Url;
use octoauth::auth::{
    self, AuthSessionController, AuthSnapshot, AuthState, FileStorage, InMemoryNavigator,
    Navigator, SystemNavigator,
};
use octoauth::config::AuthConfig;
use octoauth::ui;

#[derive(Parser)]
#[command(name = "octoauth")]
#[command(about = "GitHub OAuth session flow, driven from the terminal")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.octoauth/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the browser and wait for GitHub to redirect back
    Login {
        /// Loopback port GitHub redirects to
        #[arg(short, long, default_value_t = auth::DEFAULT_PORT)]
        port: u16,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Complete a sign-in from a callback URL copied out of the browser
    Callback {
        /// The full address GitHub redirected to
        url: String,
    },

    /// Print the authorization URL without navigating
    Url {
        #[arg(short, long, default_value_t = auth::DEFAULT_PORT)]
        port: u16,
    },

    /// Show the current session
    Status,

    /// Sign out and forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => octoauth::config::load_from(path)?,
        None => octoauth::config::load()?,
    };

    match cli.command {
        Commands::Login { port, no_browser } => run_login(config, port, no_browser).await?,

        Commands::Callback { url } => {
            let url = Url::parse(&url)?;
            let navigator = Arc::new(SystemNavigator::new(url, false));
            let controller = controller(&config, navigator)?;
            controller.initialize().await;
            print_snapshot(&controller.snapshot());
        }

        Commands::Url { port } => {
            let config = with_loopback_redirect(config, port);
            let navigator = Arc::new(InMemoryNavigator::new(Url::parse(&auth::loopback_url(port))?));
            let controller = controller(&config, navigator.clone())?;
            controller.initialize().await;

            if let Err(e) = controller.sign_in() {
                report_sign_in_error(&e);
                return Err(e.into());
            }
            match navigator.assigned().last() {
                Some(url) => println!("{}", url),
                None => ui::print_step("Already signed in; run 'octoauth logout' first."),
            }
        }

        Commands::Status => {
            let navigator = Arc::new(InMemoryNavigator::new(Url::parse(&auth::loopback_url(auth::DEFAULT_PORT))?));
            let controller = controller(&config, navigator)?;
            controller.initialize().await;

            ui::print_banner();
            ui::print_step(&format!(
                "Client id: {}",
                if config.client_id().is_some() { "✓" } else { "not set" }
            ));
            ui::print_step(&format!("Storage: {:?}", config.storage_path()));
            print_snapshot(&controller.snapshot());
        }

        Commands::Logout => {
            let navigator = Arc::new(InMemoryNavigator::new(Url::parse(&auth::loopback_url(auth::DEFAULT_PORT))?));
            let controller = controller(&config, navigator)?;
            controller.initialize().await;
            controller.sign_out()?;
            ui::print_success("Signed out");
        }
    }

    Ok(())
}

fn controller(config: &AuthConfig, navigator: Arc<dyn Navigator>) -> Result<AuthSessionController> {
    let storage = Arc::new(FileStorage::new(config.storage_path()));
    Ok(AuthSessionController::with_github(config.clone(), storage, navigator)?)
}

/// Point the redirect at the loopback listener unless one is configured
fn with_loopback_redirect(mut config: AuthConfig, port: u16) -> AuthConfig {
    if config.redirect_uri.is_none() {
        config.redirect_uri = Some(auth::loopback_url(port));
    }
    config
}

async fn run_login(config: AuthConfig, port: u16, no_browser: bool) -> Result<()> {
    let config = with_loopback_redirect(config, port);
    let start = Url::parse(&auth::loopback_url(port))?;

    let controller = controller(&config, Arc::new(SystemNavigator::new(start, !no_browser)))?;
    controller.initialize().await;

    if let Some(profile) = controller.snapshot().profile() {
        ui::print_success("Already signed in");
        ui::print_profile(profile);
        return Ok(());
    }

    // Listen before sending the browser away so the redirect has somewhere to land
    let listener = auth::bind_loopback(port).await?;
    let listener = tokio::spawn(auth::wait_for_redirect(listener));

    ui::print_thinking("Opening GitHub authorization");
    if let Err(e) = controller.sign_in() {
        listener.abort();
        report_sign_in_error(&e);
        return Err(e.into());
    }
    controller.dispose();

    ui::print_thinking("Waiting for authorization");
    let callback = listener.await??;

    // The redirect is a fresh page load on the callback address
    let reloaded = self::controller(&config, Arc::new(SystemNavigator::new(callback, false)))?;
    reloaded.initialize().await;
    print_snapshot(&reloaded.snapshot());

    Ok(())
}

fn report_sign_in_error(err: &octoauth::Error) {
    ui::print_error(&err.to_string());
    if matches!(err, octoauth::Error::ConfigurationMissing(_)) {
        ui::print_step("Register an OAuth app at https://github.com/settings/developers");
        ui::print_step("then export GITHUB_CLIENT_ID=<client id> or add it to ~/.octoauth/config.json");
    }
}

fn print_snapshot(snapshot: &AuthSnapshot) {
    match snapshot.state() {
        AuthState::Authenticated(profile) => {
            ui::print_success("Signed in with GitHub");
            ui::print_profile(profile);
        }
        AuthState::ConfigMissing => ui::print_warning("Incomplete configuration: no GitHub client id"),
        AuthState::Unauthenticated | AuthState::Initializing => {
            ui::print_step("Not signed in (run 'octoauth login')");
        }
    }
}
