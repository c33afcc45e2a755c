//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the service objects in dependency order
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last; traffic only arrives once the router is built

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::HttpServer;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A server that is bound but not yet serving.
pub struct Started {
    pub server: HttpServer,
    pub listener: TcpListener,
    pub local_addr: SocketAddr,
}

/// Build the server and bind its listener.
pub async fn bind(config: AppConfig) -> Result<Started, StartupError> {
    let address = config.listener.bind_address.clone();
    let bind_error = |source| StartupError::Bind {
        address: address.clone(),
        source,
    };

    let server = HttpServer::new(config);
    let listener = TcpListener::bind(&address).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(address = %local_addr, "Listening for connections");

    Ok(Started {
        server,
        listener,
        local_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();

        let started = bind(config).await.unwrap();
        assert_ne!(started.local_addr.port(), 0);
        assert!(started.local_addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn reports_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = AppConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        let err = bind(config).await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
