//! Maestro CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use serenity::all::GatewayIntents;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maestro")]
#[command(about = "Community bot: AI tutor, server architect, and reaction roles")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Maestro...");

    let config = Arc::new(
        maestro::config::Config::load().context("failed to load configuration from environment")?,
    );
    tracing::info!(data_dir = %config.data_dir.display(), "Configuration loaded");

    let optin = Arc::new(maestro::store::OptInStore::load(config.optin_path()));
    let reaction_roles = Arc::new(maestro::store::ReactionRoleStore::load(
        config.reaction_roles_path(),
    ));
    tracing::info!(
        opted_in = optin.len().await,
        "Stores loaded"
    );

    let gateway = Arc::new(maestro::llm::Gateway::from_config(&config.llm));
    let tasks = maestro::tasks::TaskSet::new();

    // Keep-alive server for the hosting platform's liveness probe.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let bind: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let server = maestro::server::start_keepalive_server(bind, shutdown_rx)
        .await
        .context("failed to start keep-alive server")?;

    let handler = maestro::discord::Handler::new(
        config.clone(),
        gateway,
        optin,
        reaction_roles,
        tasks.clone(),
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .context("failed to build Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::select! {
        result = client.start() => {
            result.context("Discord client exited with error")?;
            tracing::info!("Discord client ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down...");
    shard_manager.shutdown_all().await;
    tasks.shutdown().await;
    let _ = shutdown_tx.send(true);
    let _ = server.await;

    tracing::info!("Maestro stopped");
    Ok(())
}
