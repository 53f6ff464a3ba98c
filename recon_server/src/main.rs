use dotenvy::dotenv;
use log::info;
use recon_server::{cli::handle_command_line_args, config::LinkerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = LinkerConfig::from_env_or_default();

    info!("🚀️ Starting recon server for account {}", config.target_account.as_deref().unwrap_or("<unset>"));
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
