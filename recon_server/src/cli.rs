use std::{env, env::VarError};

/// There's no real CLI for the server, so any argument prints the help text.
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
    // The database URL may carry credentials, so it is left out.
    const DISPLAY_ENVS: [&str; 9] = [
        "RUST_LOG",
        "RECON_TARGET_ACCOUNT",
        "RECON_POLL_INTERVAL_SECS",
        "RECON_MATCH_WINDOW_HOURS",
        "RECON_CYCLE_TIMEOUT_SECS",
        "RECON_HOST",
        "RECON_PORT",
        "RECON_DISABLE_STATUS_SERVER",
        "RECON_RUN_MIGRATIONS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
