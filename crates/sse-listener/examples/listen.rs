//! Listen Example
//!
//! Prints every event received from an event stream until the session ends.
//!
//! Run with: `cargo run -p sse-listener --example listen -- <url>`

use std::time::Duration;

use sse_listener::{HttpOpenerConfig, ListenerConfig, listen_request};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sse_listener=info,listen=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(url) = std::env::args().nth(1) else {
        eprintln!("usage: listen <url>");
        std::process::exit(2);
    };

    let request = HttpOpenerConfig::new(url).connect_timeout(Duration::from_secs(10));
    let config = ListenerConfig::new()
        .reconnect_min_interval(Duration::from_secs(1))
        .reconnect_max_interval(Duration::from_secs(30))
        .reconnect_jitter(0.1);

    let session = listen_request(request, config).await?;
    let (handle, mut stream) = session.split();

    loop {
        tokio::select! {
            event = stream.next_event() => match event {
                Some(event) => println!("{}: {}", event.name(), event.data()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing");
                // The session may already be gone if it ended meanwhile.
                if let Err(e) = handle.close().await {
                    debug!(error = %e, "Close not delivered");
                }
                break;
            }
        }
    }
    drop(stream);

    let termination = handle.termination().await;
    if termination.is_failure() {
        error!(reason = %termination, "Session failed");
    } else {
        info!("Session closed");
    }
    Ok(())
}
