use std::{env, env::VarError};

const SERVER_ENVS: [&str; 7] = [
    "RUST_LOG",
    "MPG_HOST",
    "MPG_PORT",
    "MPG_DATABASE_URL",
    "MPG_CLIENT_URL",
    "MPG_CURRENCY",
    "MPG_USE_X_FORWARDED_FOR",
];

const STRIPE_ENVS: [&str; 3] = ["MPG_STRIPE_API_BASE", "MPG_STRIPE_TIMEOUT_SECS", "MPG_WEBHOOK_TOLERANCE_SECS"];

const EMAIL_ENVS: [&str; 2] = ["MPG_EMAIL_API_URL", "MPG_EMAIL_FROM"];

/// Only ever reported as set / not set.
const SECRET_ENVS: [&str; 3] = ["MPG_STRIPE_SECRET_KEY", "MPG_STRIPE_WEBHOOK_SECRET", "MPG_EMAIL_API_KEY"];

/// The server takes no arguments. Any argument at all prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    println!("Current environment values:");
    print_section("Server", &SERVER_ENVS, env_value);
    print_section("Stripe", &STRIPE_ENVS, env_value);
    print_section("Email", &EMAIL_ENVS, env_value);
    print_section("Secrets", &SECRET_ENVS, |name| match env::var(name) {
        Ok(s) if !s.trim().is_empty() => "Set".into(),
        _ => "Not set".into(),
    });
}

fn print_section<F: Fn(&str) -> String>(title: &str, names: &[&str], value: F) {
    println!("  {title}");
    for name in names {
        println!("    {name:<33} {:<15}", value(name));
    }
}

fn env_value(name: &str) -> String {
    match env::var(name) {
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    }
}
