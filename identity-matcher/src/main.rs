use identity_matcher::{app, config::MatcherServiceConfig};
use log::{error, info, warn};
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match MatcherServiceConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if !config.requires_credentials() {
        warn!("MATCHER_TOKEN_SIGNING_KEY is empty, /match accepts unauthenticated calls");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Identity matcher running on {}", addr);
    let serve = axum::serve(listener, app(&config))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down");
        })
        .await;
    if let Err(e) = serve {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
