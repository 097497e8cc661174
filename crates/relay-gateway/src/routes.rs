//! HTTP surface: one POST route per command under `/api/v1/instance/:instance_id/`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use relay_core::{Command, CommandReply, DispatchError, Dispatcher, ErrorBody, ValidationError};
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub expose_diagnostics: bool,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, expose_diagnostics: bool) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            expose_diagnostics,
        }
    }
}

/// A failed command, rendered with the status its error kind maps to.
pub struct ApiError {
    error: DispatchError,
    expose_diagnostics: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody::from_error(&self.error, self.expose_diagnostics);
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(health));
    for command in Command::ALL {
        let path = format!("/api/v1/instance/:instance_id/{}", command.route());
        let handler = move |State(state): State<AppState>,
                            Path(instance_id): Path<String>,
                            body: Bytes| async move {
            run_command(state, command, instance_id, body).await
        };
        app = app
            .route(&format!("{path}/"), post(handler.clone()))
            .route(&path, post(handler));
    }
    app.with_state(state)
        .layer(middleware::from_fn(log_requests))
}

async fn run_command(
    state: AppState,
    command: Command,
    instance_id: String,
    body: Bytes,
) -> Result<Json<CommandReply>, ApiError> {
    let reply = match parse_body(&body) {
        Ok(body) => state.dispatcher.dispatch(command, &instance_id, body).await,
        Err(err) => Err(DispatchError::from(err)),
    };
    reply.map(Json).map_err(|error| ApiError {
        error,
        expose_diagnostics: state.expose_diagnostics,
    })
}

/// An empty body reads as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|err| ValidationError::Malformed {
        path: "value".to_string(),
        reason: format!("must be valid JSON: {err}"),
    })
}

async fn log_requests(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    tracing::info!(method = %request.method(), path = %request.uri().path(), %peer, "request");
    next.run(request).await
}

async fn health() -> &'static str {
    "OK"
}
