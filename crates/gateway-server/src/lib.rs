//! # Gateway Server
//!
//! HTTP server implementation for the LLM Inference Gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - OpenAI-compatible API endpoints (completions, chat, ensemble debate)
//! - Request/response handling and semantic-cache integration
//! - Request-id, logging, CORS, and bearer-token middleware
//! - Liveness/readiness/deep health checks
//! - Graceful shutdown handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use auth::{auth_middleware, AuthConfig, AuthError, AuthState};
pub use error::ApiError;
pub use health::{
    ComponentHealth, HealthChecker, HealthConfig, HealthResponse, HealthStatus,
    LivenessResponse, ProviderHealthResult, ReadinessResponse, StartupResponse,
};
pub use routes::create_router;
pub use server::{Server, ServerConfig};
pub use shutdown::{
    GracefulServer, RequestGuard, ShutdownConfig, ShutdownCoordinator, ShutdownEvent,
    ShutdownPhase, ShutdownStats,
};
pub use state::{AppState, AppStateBuilder};
