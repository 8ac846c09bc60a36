//! Worldchat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 50 members per room, WebSocket at /ws, occupancy at /rooms
//! worldchat-server --bind 0.0.0.0:8000
//!
//! # Smaller rooms for load testing
//! worldchat-server --bind 0.0.0.0:8000 --capacity 4
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use worldchat_server::{DriverConfig, ROOM_CAPACITY, Server, ServerRuntimeConfig};

/// Worldchat room-assignment server
#[derive(Parser, Debug)]
#[command(name = "worldchat-server")]
#[command(about = "Room-assignment chat server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    bind: String,

    /// Members per room
    #[arg(long, default_value_t = ROOM_CAPACITY)]
    capacity: u32,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("worldchat server starting");

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        driver: DriverConfig { capacity: args.capacity, max_connections: args.max_connections },
    };

    let server = Server::bind(config)?;
    tracing::info!("listening on {}", server.local_addr());

    server.run().await?;

    Ok(())
}
