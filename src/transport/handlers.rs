use super::connection;
use super::protocol::*;
use crate::coordinator::{ConnectionMeta, StateServer};
use crate::error::{Result, StateError};
use crate::handshake::HandshakeParams;
use crate::registry::ConnectionId;
use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Health check, message socket and a 404 fallback.
pub fn router(server: Arc<StateServer>) -> Router {
    let path = server.config().path.clone();
    Router::new()
        .route(
            ENDPOINT_HEALTH_CHECK,
            get(handle_health_check).fallback(handle_not_found),
        )
        .route(&path, any(handle_socket))
        .fallback(handle_not_found)
        .with_state(server)
}

pub async fn serve(server: Arc<StateServer>, listener: TcpListener) -> std::io::Result<()> {
    let app = router(server);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

pub async fn handle_health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub async fn handle_not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Runs the handshake gate, then upgrades.
///
/// Refusals are plain HTTP answers: `401` for auth, `426` for versions.
pub async fn handle_socket(
    State(server): State<Arc<StateServer>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<HandshakeParams>,
    headers: HeaderMap,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    let Some(upgrade) = upgrade else {
        return handle_not_found().await.into_response();
    };

    let forwarded_for = server
        .config()
        .forwarded_for_header
        .as_deref()
        .and_then(|name| headers.get(name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let remote_address = forwarded_for
        .as_deref()
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string());

    if let Err(e) = server.compatibility().admit(
        &params,
        server.config().secret.as_deref(),
        &remote_address,
    ) {
        tracing::warn!("Refused connection from {}: {}", remote_address, e);
        return (refusal_status(&e), Json(WireError::from(&e))).into_response();
    }

    let meta = ConnectionMeta {
        remote_ip: peer.ip(),
        forwarded_for,
        instance_port: params.port(),
        instance_type: params.instance_type(),
    };
    upgrade.on_upgrade(move |socket| connection::run(server, socket, meta))
}

/// `401` for auth, `426` for version problems.
pub fn refusal_status(err: &StateError) -> StatusCode {
    match err {
        StateError::BadClusterAuth => StatusCode::UNAUTHORIZED,
        e if e.is_handshake_refusal() => StatusCode::UPGRADE_REQUIRED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Routes one client request to the server.
pub async fn dispatch(
    server: &Arc<StateServer>,
    id: &ConnectionId,
    event: &str,
    data: Value,
) -> Result<Value> {
    server.record_invoke();

    match event {
        EVENT_BROKER_JOIN => {
            server.broker_join(id, parse(event, data)?).await?;
            Ok(Value::Null)
        }
        EVENT_BROKER_LEAVE => {
            server.broker_leave(id).await;
            Ok(Value::Null)
        }
        EVENT_WORKER_JOIN => encode(server.worker_join(id, parse(event, data)?).await?),
        EVENT_WORKER_LEAVE => {
            server.worker_leave(id).await;
            Ok(Value::Null)
        }
        EVENT_MASTER_REGISTER => encode(server.master_register(id, parse(event, data)?).await?),
        EVENT_MASTER_RECONNECT => {
            encode(server.master_reconnect(id, parse(event, data)?).await?)
        }
        EVENT_MASTER_JOIN => {
            server.master_join(id).await?;
            Ok(Value::Null)
        }
        EVENT_MASTER_LEAVE => {
            server.master_leave(id).await;
            Ok(Value::Null)
        }
        EVENT_STATE => {
            let dynamic_only = if data.is_null() {
                false
            } else {
                parse(event, data)?
            };
            Ok(server.server_state(dynamic_only).await)
        }
        other => Err(StateError::UnknownEvent {
            event: other.to_string(),
        }),
    }
}

fn parse<T: DeserializeOwned>(event: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| StateError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| StateError::Encode(e.to_string()))
}
