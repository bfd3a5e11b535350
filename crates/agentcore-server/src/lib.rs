//! HTTP entrypoint for an agent hosted on a managed AgentCore runtime.
//!
//! The runtime contract is two routes: `POST /invocations` forwards the
//! `prompt` field to the agent and replies with `{"result": ...}` or, when
//! streaming, with one server-sent JSON event per agent event; `GET /ping`
//! reports health.

pub mod config;
pub mod context;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{AgentSettings, ModelProvider};
pub use context::{AppContext, EntrypointMode};
pub use handlers::{InvocationRequest, InvocationResponse};

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/invocations", post(handlers::invocations))
        .route("/ping", get(handlers::ping))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
