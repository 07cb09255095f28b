mod broadcast;
mod config;
mod context;
mod events;
mod network;

use config::ServerConfig;
use context::ServerContext;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

const TICK_DURATION: Duration = Duration::from_millis(50); // 20 TPS
const TIME_BROADCAST_INTERVAL_TICKS: u32 = 20; // once per second

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Pickaxe server...");

    let config = ServerConfig::load(Path::new("config/server.toml"))?;
    info!(
        "Config loaded: bind={}:{}, max_players={}, online_mode={}",
        config.bind, config.port, config.max_players, config.online_mode
    );

    let addr = format!("{}:{}", config.bind, config.port);
    let ctx = Arc::new(ServerContext::new(config));
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    tokio::select! {
        _ = run_tick_loop(ctx.clone(), &mut shutdown_rx) => {
            info!("Server shut down cleanly");
        }
        _ = accept_loop(listener, ctx) => {
            error!("Accept loop exited unexpectedly");
        }
    }

    Ok(())
}

/// Process-wide ticking (spec.md §4.6 C6): advance world time and periodically
/// push it to connected clients. Per-connection state (keep-alive, movement,
/// chat) is driven entirely by each connection's own task in `network.rs`.
async fn run_tick_loop(ctx: Arc<ServerContext>, shutdown_rx: &mut tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(TICK_DURATION);
    let mut tick_count: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ctx.world_time.lock().unwrap().tick();
                tick_count = tick_count.wrapping_add(1);
                if tick_count % TIME_BROADCAST_INTERVAL_TICKS == 0 {
                    if let Err(e) = events::broadcast_update_time(&ctx) {
                        error!("failed to broadcast world time: {}", e);
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, ctx: Arc<ServerContext>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection from {}", peer);
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    network::handle_connection(ctx, socket).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
