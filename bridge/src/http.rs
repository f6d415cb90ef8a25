use crate::{session::Session, Error};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use pipette_protocol::DeviceCommand;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const INDEX_PAGE: &str = include_str!("../gui/index.html");

pub fn router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/send", post(send))
        .route("/status", get(status))
        .with_state(session)
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum SendReply {
    Ok { sent: String, received: String },
    Error { message: String },
}

#[derive(Debug, Serialize)]
struct StatusReply {
    serial_open: bool,
    version: &'static str,
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn status(State(session): State<Arc<Session>>) -> Json<StatusReply> {
    Json(StatusReply {
        serial_open: session.is_open(),
        version: crate::VERSION,
    })
}

async fn send(State(session): State<Arc<Session>>, body: Bytes) -> (StatusCode, Json<SendReply>) {
    let command = decode_body(&body)
        .and_then(|message| pipette_protocol::command_for(&message))
        .map(DeviceCommand::into_string)
        .unwrap_or_default();

    let result = tokio::task::spawn_blocking(move || session.transact(&command))
        .await
        .unwrap_or_else(|e| Err(Error::IoFailure(e.to_string())));

    match result {
        Ok(exchange) => (
            StatusCode::OK,
            Json(SendReply::Ok {
                sent: exchange.sent,
                received: exchange.received,
            }),
        ),
        Err(e) => {
            warn!("Command failed: {e}");
            (
                e.status_code(),
                Json(SendReply::Error {
                    message: e.to_string(),
                }),
            )
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::EmptyCommand => StatusCode::BAD_REQUEST,
            Error::DeviceUnavailable | Error::IoFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Reads a GUI message from a JSON body, falling back to form fields.
///
/// In a form the `payload` field may carry the nested object as JSON text.
fn decode_body(body: &[u8]) -> Option<Value> {
    if let Ok(message @ Value::Object(_)) = serde_json::from_slice::<Value>(body) {
        return Some(message);
    }

    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
    if fields.is_empty() {
        debug!("Request body is neither JSON nor a form");
        return None;
    }

    let message: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| {
            let value = match name.as_str() {
                "payload" => serde_json::from_str(&value).unwrap_or(Value::String(value)),
                _ => Value::String(value),
            };
            (name, value)
        })
        .collect();

    Some(Value::Object(message))
}
