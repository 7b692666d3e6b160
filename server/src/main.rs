use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, Timings};
use server::network::Server;

/// Main-method of the lobby server.
/// Parses command-line arguments, binds the listener and runs the event loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
        /// Maximum number of concurrent connections
        #[clap(short, long, default_value = "256")]
        max_clients: usize,
        /// Delay between two dealt cards, in milliseconds
        #[clap(long, default_value = "300")]
        card_interval_ms: u64,
        /// Delay before dealing to the next player, in milliseconds
        #[clap(long, default_value = "500")]
        player_interval_ms: u64,
        /// Delay before a drawn card is revealed, in milliseconds
        #[clap(long, default_value = "1000")]
        draw_reveal_ms: u64,
        /// Delay before the draw lock is released, in milliseconds
        #[clap(long, default_value = "500")]
        draw_unlock_ms: u64,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        timings: Timings::from_millis(
            args.card_interval_ms,
            args.player_interval_ms,
            args.draw_reveal_ms,
            args.draw_unlock_ms,
        ),
    };
    info!("Starting lobby server with {:?}", config);

    let server = Server::bind(config).await?;
    let handle = server.handle();
    let mut server_task = tokio::spawn(server.run());

    // Handle shutdown gracefully
    let interrupted = tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
            false
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
            true
        }
    };

    if interrupted {
        let _ = server_task.await;
    }

    Ok(())
}
