use colored::*;
use crate::auth::Profile;

pub fn print_banner() {
    let name = "octoauth".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// Print a signed-in user, flagging synthesised profiles
pub fn print_profile(profile: &Profile) {
    let user = profile.user();
    println!("  {} ({})", user.display_name.bold(), user.login_name.cyan());
    println!("  {}", user.email);
    println!("  {}", user.avatar_url.black().bold());

    if profile.is_demo() {
        print_warning("Demo profile: GitHub data was not available, this identity is synthesised");
    }
}
