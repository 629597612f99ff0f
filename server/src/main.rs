use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use bubble_server::matchmaker::Matchmaker;
use bubble_server::{http, session};
use bubble_shared::protocol::DEFAULT_PORT;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// WebSocket port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// HTTP status port to listen on
    #[clap(long, default_value = "2568")]
    http_port: u16,

    /// Tick rate (simulation updates per second)
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info cargo run");
    }

    let args = Args::parse();
    let ws_addr = format!("{}:{}", args.host, args.port);
    let http_addr = format!("{}:{}", args.host, args.http_port);
    let tick_interval = Duration::from_secs_f32(1.0 / args.tick_rate as f32);

    info!(
        "Starting arena server on ws://{} (status on http://{})",
        ws_addr, http_addr
    );
    info!(
        "Tick rate: {} Hz ({:?} per tick)",
        args.tick_rate, tick_interval
    );

    let matchmaker = Matchmaker::new(tick_interval);

    // Status endpoints run beside the game listener.
    let http_matchmaker = Arc::clone(&matchmaker);
    tokio::spawn(async move {
        if let Err(e) = http::serve(http_matchmaker, &http_addr).await {
            error!("HTTP status server failed: {}", e);
        }
    });

    let listener = TcpListener::bind(&ws_addr).await?;
    info!("WebSocket server listening on {}", ws_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let matchmaker = Arc::clone(&matchmaker);
                        tokio::spawn(async move {
                            session::handle_connection(stream, addr, matchmaker).await;
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                matchmaker.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}
