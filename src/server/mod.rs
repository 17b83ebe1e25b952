// src/server/mod.rs

//! Development HTTP server for `serve`.
//!
//! Serves the generated site directory, injects the live-reload client into
//! HTML pages and exposes the WebSocket endpoint the client listens on.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::errors::{Result, SiteError};

pub mod html;
pub mod livereload;

pub use livereload::{LiveReload, ReloadMessage};

#[derive(Debug, Clone)]
struct ServerState {
    site_dir: Arc<PathBuf>,
    hub: LiveReload,
}

/// Build the router serving `site_dir`.
pub fn router(site_dir: PathBuf, hub: LiveReload) -> Router {
    let state = ServerState {
        site_dir: Arc::new(site_dir.clone()),
        hub,
    };

    Router::new()
        .route("/__livereload", get(livereload::ws_handler))
        .route("/__livereload.js", get(livereload::script_handler))
        .fallback_service(ServeDir::new(site_dir))
        .layer(middleware::from_fn_with_state(state.clone(), inject_html))
        .with_state(state)
}

/// Serve HTML pages with the live-reload script added; everything else goes
/// to the static file service untouched.
async fn inject_html(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let is_read = req.method() == Method::GET || req.method() == Method::HEAD;

    if is_read && !path.starts_with("/__livereload") {
        if let Some(file) = html::resolve_html_path(&state.site_dir, &path) {
            match tokio::fs::read_to_string(&file).await {
                Ok(contents) => {
                    debug!(path = %path, file = %file.display(), "serving page with live-reload");
                    return Html(html::inject_script(&contents)).into_response();
                }
                Err(e) => warn!(path = %path, error = %e, "failed to read page; serving as-is"),
            }
        }
    }

    next.run(req).await
}

/// Dev server bound to a socket but not yet serving.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    app: Router,
}

impl DevServer {
    /// Bind `host:port`. Port 0 picks a free port.
    pub async fn bind(host: &str, port: u16, site_dir: PathBuf, hub: LiveReload) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| SiteError::Server(format!("failed to bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            app: router(site_dir, hub),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!("serving site at http://{addr}");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| SiteError::Server(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_pages_with_client_and_assets_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        std::fs::write(dir.path().join("main.css"), "body{}").unwrap();

        let server = DevServer::bind("127.0.0.1", 0, dir.path().to_path_buf(), LiveReload::new())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async move {
            let _ = stop_rx.await;
        }));

        let page = get(addr, "/").await;
        assert!(page.contains(html::SCRIPT_TAG), "{page}");

        let css = get(addr, "/main.css").await;
        assert!(css.ends_with("body{}"), "{css}");

        let script = get(addr, "/__livereload.js").await;
        assert!(script.contains("/__livereload"), "{script}");

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    async fn wait_for_subscribers(hub: &LiveReload, expected: usize) {
        let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while hub.subscriber_count() != expected {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "expected {expected} live-reload subscribers");
    }

    #[tokio::test]
    async fn closed_tab_releases_its_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let hub = LiveReload::new();
        let server = DevServer::bind("127.0.0.1", 0, dir.path().to_path_buf(), hub.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async move {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let upgrade = format!(
            "GET /__livereload HTTP/1.1\r\nHost: {addr}\r\nConnection: Upgrade\r\n\
             Upgrade: websocket\r\nSec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
        );
        stream.write_all(upgrade.as_bytes()).await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(
            String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 101"),
            "upgrade refused"
        );
        wait_for_subscribers(&hub, 1).await;

        // The tab goes away without any reload being broadcast.
        drop(stream);
        wait_for_subscribers(&hub, 0).await;

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
