pub mod adapters;
mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod ports;
pub mod push;
mod state;
pub mod types;

use std::net::SocketAddr;

pub use app::app;
pub use error::PushError;
pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app(config)).await
}
