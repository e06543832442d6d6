//! Server bootstrap: binds the router to a socket and runs it under
//! graceful-shutdown coordination.

use std::net::SocketAddr;

use tracing::info;

use crate::{
    auth::{AuthConfig, AuthState},
    routes::create_router,
    shutdown::{GracefulServer, ShutdownConfig},
    state::AppState,
};

/// Bind address and shutdown tuning for [`Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    shutdown: ShutdownConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Start from defaults (`0.0.0.0:8080`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bind port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the graceful-shutdown tuning.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownConfig) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn socket_addr(&self) -> Result<SocketAddr, std::io::Error> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }
}

/// The gateway's HTTP server: a bound router running under
/// [`GracefulServer`] shutdown coordination.
pub struct Server {
    config: ServerConfig,
    state: AppState,
    auth: AuthState,
}

impl Server {
    /// Build a server from its config and already-assembled state. Auth
    /// is derived from `state.config.security`.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let auth = AuthState::new(AuthConfig::from_jwt_secret_stub(
            state.config.security.jwt_secret.clone(),
        ));
        Self {
            config,
            state,
            auth,
        }
    }

    /// Run until a shutdown signal (Ctrl+C or SIGTERM) is received,
    /// draining in-flight requests before returning.
    ///
    /// # Errors
    /// Returns an error if the socket address is invalid or the bind
    /// fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.socket_addr()?;
        let graceful = GracefulServer::new(self.config.shutdown.clone());
        let coordinator = graceful.coordinator();

        let health_checker = self.state.health_checker.clone();
        coordinator
            .register_shutdown_hook(move || health_checker.mark_shutting_down())
            .await;

        let router = create_router(self.state, self.auth, coordinator.clone());

        info!(%addr, "binding gateway HTTP server");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        graceful
            .run_until_shutdown(|coordinator| async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let mut phase = coordinator.subscribe_phase();
                        while phase.changed().await.is_ok() {
                            if coordinator.is_shutting_down() {
                                break;
                            }
                        }
                    })
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            })
            .await;

        Ok(())
    }
}
