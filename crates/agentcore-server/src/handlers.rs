//! `/invocations` and `/ping` handlers.

use std::convert::Infallible;

use agentcore_core::events::AgentEvent;
use agentcore_core::session::SessionKey;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;

/// Body of `POST /invocations`. Unknown fields are ignored and a missing
/// prompt is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InvocationRequest {
    pub prompt: String,
}

impl InvocationRequest {
    /// An empty body is treated like `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub result: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code: code.to_string(),
            },
        }
    }

    fn invalid_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", error)
    }

    fn agent(err: &anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "Healthy".to_string(),
    })
}

pub async fn invocations(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = InvocationRequest::from_body(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed invocation payload");
        ApiError::invalid_request(format!("Invalid JSON payload: {e}"))
    })?;
    let session = ctx.session_key(&headers);
    let stream = ctx.wants_stream(&headers);

    tracing::info!(
        session = %session,
        stream,
        prompt_chars = request.prompt.chars().count(),
        "Invocation received"
    );

    if stream {
        return Ok(stream_invocation(ctx, session, request.prompt).into_response());
    }

    match ctx.agent().invoke(&session, &request.prompt).await {
        Ok(reply) => Ok(Json(InvocationResponse {
            result: reply.text_content(),
        })
        .into_response()),
        Err(e) => {
            tracing::error!(session = %session, error = %e, "Agent invocation failed");
            Err(ApiError::agent(&e))
        }
    }
}

/// Relays agent events as they are produced. A failure becomes one `error`
/// event and ends the stream.
fn stream_invocation(
    ctx: AppContext,
    session: SessionKey,
    prompt: String,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let events = async_stream::stream! {
        let mut agent_events = match ctx.agent().stream(&session, &prompt).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(session = %session, error = %e, "Agent stream failed to start");
                yield Ok::<_, Infallible>(error_event(&e));
                return;
            }
        };

        let mut forwarded = 0usize;
        while let Some(item) = agent_events.next().await {
            match item {
                Ok(event) => {
                    forwarded += 1;
                    yield Ok(sse_event(&event));
                }
                Err(e) => {
                    tracing::error!(session = %session, error = %e, forwarded, "Agent stream failed");
                    yield Ok(error_event(&e));
                    break;
                }
            }
        }
        tracing::debug!(session = %session, forwarded, "Agent stream finished");
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn sse_event(event: &AgentEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

fn error_event(err: &anyhow::Error) -> Event {
    let payload = serde_json::json!({
        "event_type": "error",
        "error": format!("{err:#}"),
        "code": "AGENT_ERROR",
    });
    Event::default().data(payload.to_string())
}
