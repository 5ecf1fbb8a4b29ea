use clap::Parser;
use client::config::ClientConfig;
use client::network::Client;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Room to join (the relay's default room when omitted)
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Collision sweep interval in milliseconds while hosting
    #[arg(long, default_value = "20")]
    sweep_interval_ms: u64,

    /// Movement tick interval in milliseconds
    #[arg(long, default_value = "16")]
    movement_interval_ms: u64,

    /// Frame interval in milliseconds
    #[arg(long, default_value = "16")]
    frame_interval_ms: u64,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Move and attack at random
    #[arg(short = 'w', long)]
    wander: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ClientConfig {
        server_url: args.server,
        room: args.room,
        sweep_interval: Duration::from_millis(args.sweep_interval_ms),
        movement_interval: Duration::from_millis(args.movement_interval_ms),
        frame_interval: Duration::from_millis(args.frame_interval_ms),
        fake_ping: Duration::from_millis(args.fake_ping),
        wander: args.wander,
    };

    info!("Starting client...");
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    if config.wander {
        info!("Wandering with random input");
    }

    let mut client = Client::new(config);
    let outcome = client.run().await?;
    info!("Session ended: {:?}", outcome);

    Ok(())
}
