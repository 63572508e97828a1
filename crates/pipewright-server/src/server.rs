//! Static file server for the destination root.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use pipewright_static::ServerConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::livereload::{inject_script, LiveReloadHub, LiveReloadMessage, LIVERELOAD_PATH};

/// Errors that can occur with the server or the watch loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File watch error")]
    Watch(#[from] notify::Error),

    #[error("Server error")]
    Serve(#[source] std::io::Error),
}

/// Serves the built site and pushes live-reload messages.
pub struct DevServer {
    config: ServerConfig,
    root: PathBuf,
    hub: LiveReloadHub,
}

impl DevServer {
    pub fn new(config: ServerConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
            hub: LiveReloadHub::new(),
        }
    }

    /// The hub the pipeline should notify after each stage.
    pub fn hub(&self) -> &LiveReloadHub {
        &self.hub
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(ws_handler))
            .fallback_service(ServeDir::new(&self.root))
            .layer(middleware::from_fn(inject_livereload))
            .layer(CorsLayer::permissive())
            .with_state(self.hub.clone())
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve on an already bound listener until the process is interrupted.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener.local_addr().map_err(ServerError::Serve)?;
        let url = self.url(local);
        tracing::info!("Serving {} at {}", self.root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open a browser: {}", e);
            }
        }

        axum::serve(listener, self.router())
            .await
            .map_err(ServerError::Serve)
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    fn url(&self, local: SocketAddr) -> String {
        format!("http://{}:{}", self.config.host, local.port())
    }
}

/// Add the client script to every HTML response.
async fn inject_livereload(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache"),
    );
    Response::from_parts(parts, Body::from(html))
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: LiveReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &LiveReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Live reload client lagged by {} message(s)", skipped);
                if send(&mut socket, &LiveReloadMessage::Reload).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &LiveReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            open: false,
        }
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn spawn(server: DevServer) -> SocketAddr {
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));
        addr
    }

    #[test]
    fn defaults_to_localhost_9000() {
        let server = DevServer::new(ServerConfig::default(), "build");
        assert_eq!(server.config.port, 9000);
        assert_eq!(server.config.host, "localhost");
        assert!(!server.config.open);
    }

    #[tokio::test]
    async fn injects_client_into_html() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("index.html"), "<html><body>hi</body></html>").unwrap();

        let addr = spawn(DevServer::new(local_config(), temp.path())).await;
        let response = get(addr, "/").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("hi<script>"));
        assert!(response.contains(LIVERELOAD_PATH));
    }

    #[tokio::test]
    async fn serves_other_files_untouched() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("assets/styles")).unwrap();
        std::fs::write(temp.path().join("assets/styles/main.css"), "a{color:red}").unwrap();

        let addr = spawn(DevServer::new(local_config(), temp.path())).await;
        let response = get(addr, "/assets/styles/main.css").await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("a{color:red}"));
        assert!(!response.contains("<script>"));
    }

    #[tokio::test]
    async fn missing_files_are_404() {
        let temp = tempdir().unwrap();

        let addr = spawn(DevServer::new(local_config(), temp.path())).await;
        let response = get(addr, "/nope.html").await;

        assert!(response.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn reports_bind_failures() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let server = DevServer::new(
            ServerConfig {
                port,
                ..local_config()
            },
            "build",
        );

        assert!(matches!(server.bind().await, Err(ServerError::Bind { .. })));
    }
}
