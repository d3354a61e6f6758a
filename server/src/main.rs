#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::any,
};
use lagstore::{
    ClientConnection, Cluster, ConnectionReply, PolicyRegistry,
    config::{ClockKind, ServerConfig},
    simulation::SimulatedTimeSource,
    storage::{SystemTimeSource, TimeSource},
    types::RequestError,
    wire::WireResponse,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
#[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected for shared state
struct AppState {
    cluster: Arc<Cluster>,
    /// Round-robin replica assignment for new connections.
    next_replica: Arc<AtomicUsize>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lagstore=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen_port={}, shards={}, replicas={}, clock={:?}",
        config.listen_port,
        config.shards,
        config.replicas,
        config.clock
    );

    let time: Arc<dyn TimeSource> = match config.clock {
        ClockKind::Real => Arc::new(SystemTimeSource),
        ClockKind::Virtual => Arc::new(SimulatedTimeSource::default_start()),
    };

    let cluster = match Cluster::from_config(&config, &PolicyRegistry::new(), time) {
        Ok(cluster) => cluster,
        Err(e) => {
            tracing::error!("Failed to build cluster: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState {
        cluster: Arc::new(cluster),
        next_replica: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/ws", any(ws_handler))
        .with_state(state);

    // Connect to the websocket on ws://127.0.0.1:<port>/ws
    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("got a websocket connection");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[allow(clippy::disallowed_methods)]
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let replica = state.next_replica.fetch_add(1, Ordering::Relaxed);
    let connection = Arc::new(ClientConnection::new(
        state.cluster.router(replica),
        Arc::clone(state.cluster.measurements()),
    ));
    tracing::debug!(
        replica = replica % state.cluster.replica_count(),
        "attached connection"
    );

    loop {
        let msg = match socket.recv().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!("websocket receive error: {e}");
                return;
            }
            None => {
                tracing::debug!("client disconnected");
                return;
            }
        };

        let text = match msg {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    let reply = WireResponse::rejected(
                        None,
                        RequestError::UnknownMessageType {
                            description: format!("binary frame is not UTF-8: {e}"),
                        },
                    );
                    if socket.send(Message::Text(reply.encode().into())).await.is_err() {
                        return;
                    }
                    continue;
                }
            },
            Message::Ping(data) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    return;
                }
                continue;
            }
            Message::Pong(_) => continue,
            Message::Close(_) => {
                tracing::debug!("client sent close");
                return;
            }
        };

        // Requests may sleep on the time source, so run them off the runtime.
        let worker = Arc::clone(&connection);
        let reply = match tokio::task::spawn_blocking(move || worker.handle_message(&text)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("request task failed: {e}");
                ConnectionReply::Respond(WireResponse::rejected(
                    None,
                    RequestError::Internal {
                        description: e.to_string(),
                    },
                ))
            }
        };

        match reply {
            ConnectionReply::Respond(response) => {
                if socket.send(Message::Text(response.encode().into())).await.is_err() {
                    tracing::debug!("client disconnected");
                    return;
                }
            }
            ConnectionReply::EndSession => {
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        }
    }
}
