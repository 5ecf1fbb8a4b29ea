use clap::Parser;
use log::info;
use server::config::RelayConfig;
use server::network::Server;
use server::room::RoomId;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of members per room
    #[arg(short, long, default_value = "32")]
    max_members: usize,

    /// Room joined by connections that do not request one
    #[arg(long, default_value = shared::DEFAULT_ROOM)]
    default_room: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = RelayConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_members: args.max_members,
        default_room: RoomId::new(args.default_room),
    };

    info!("Starting relay...");
    info!("Max members per room: {}", config.max_members);
    info!("Default room: {}", config.default_room);

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
