//! API server implementation

use axum::Router;
use sheetmatch_core::SheetmatchConfig;
use tokio::net::TcpListener;

use crate::routes::router;
use crate::state::AppState;
use crate::Result;

/// Sheetmatch HTTP server
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a loaded configuration.
    pub fn new(config: SheetmatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: AppState::new(config),
        })
    }

    /// Shared state, for callers that embed the router.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The application router.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let address = self.state.config.server.bind_address();
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let address = listener.local_addr()?;
        let sweeper = self.state.spawn_sweeper();
        tracing::info!("Sheetmatch listening on http://{address}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        sweeper.abort();
        tracing::info!("Sheetmatch stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = SheetmatchConfig::default();
        config.compare.chunk_size = 0;
        assert!(Server::new(config).is_err());
    }

    #[test]
    fn test_new_uses_config() {
        let mut config = SheetmatchConfig::default();
        config.server.port = 9123;
        let server = Server::new(config).unwrap();
        assert_eq!(server.state().config.server.port, 9123);
    }
}
