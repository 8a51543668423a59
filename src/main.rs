/// Notekeeper - personal notes backend
///
/// Accounts, notes with images and tags, public notes with bookmarks,
/// and AI-assisted summarization and image analysis.

mod account;
mod ai;
mod api;
mod auth;
mod bookmarks;
mod config;
mod context;
mod db;
mod error;
mod media_store;
mod notes;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "notekeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner(&config);

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
    _   __      __       __
   / | / /___  / /____  / /_____  ___  ____  ___  _____
  /  |/ / __ \/ __/ _ \/ //_/ _ \/ _ \/ __ \/ _ \/ ___/
 / /|  / /_/ / /_/  __/ ,< /  __/  __/ /_/ /  __/ /
/_/ |_/\____/\__/\___/_/|_|\___/\___/ .___/\___/_/
                                   /_/
        Personal notes backend v{}
        "#,
        config.service.version
    );
}
