//! Development server with live reload
//!
//! Serves the build root over HTTP. HTML pages get a small client script
//! injected that subscribes to a Server-Sent Events stream at
//! `/__livereload`; the watcher pushes `reload` (full page) and `css`
//! (re-fetch stylesheets) events through a [`LiveReload`] handle.
//!
//! The server runs on its own thread with its own multi-threaded tokio
//! runtime, so the synchronous watch loop never blocks it.

use axum::extract::{Request, State};
use axum::http::{header, Method};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::build::ReloadKind;
use crate::config::ServerConfig;
use crate::watch::ReloadSink;

/// Path of the event stream.
pub const EVENTS_PATH: &str = "/__livereload";
/// Path of the client script.
pub const CLIENT_PATH: &str = "/__livereload.js";

const SCRIPT_TAG: &str = "<script src=\"/__livereload.js\"></script>";

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function (link) {
      var url = new URL(link.href, window.location.href);
      url.searchParams.set("livereload", Date.now().toString());
      link.href = url.toString();
    });
  });
})();
"#;

/// Error starting or running the dev server
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The listen address is invalid or in use
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// The runtime or server thread could not be created
    #[error("Failed to start server runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The server stopped with an I/O error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Broadcast handle for live-reload events.
///
/// Cloning is cheap; every clone feeds the same connected browsers.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadKind>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }

    /// Number of connected browsers.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadSink for LiveReload {
    fn notify(&self, kind: ReloadKind) {
        match self.tx.send(kind) {
            Ok(clients) => debug!("Sent '{}' to {} client(s)", kind.event_name(), clients),
            Err(_) => debug!("No clients connected for '{}'", kind.event_name()),
        }
    }
}

#[derive(Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    reload: LiveReload,
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], SCRIPT_TAG, &html[idx..]),
        None => format!("{}{}", html, SCRIPT_TAG),
    }
}

/// Map a request path to an HTML file under the root.
///
/// Directory requests ending in `/` map to their `index.html`. Paths that try
/// to leave the root, percent-encoded paths, and non-HTML files return `None`
/// and are left to the static file service.
pub fn resolve_html(root: &Path, uri_path: &str) -> Option<PathBuf> {
    if uri_path.contains('%') {
        return None;
    }

    let mut file = root.to_path_buf();
    for component in Path::new(uri_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => file.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if uri_path.ends_with('/') || uri_path.is_empty() {
        file.push("index.html");
    }

    let is_html = file.extension().is_some_and(|ext| ext == "html" || ext == "htm");
    (is_html && file.is_file()).then_some(file)
}

/// Build the dev server's router for a build root.
pub fn router(root: PathBuf, reload: LiveReload) -> Router {
    let state = ServerState { root: Arc::new(root), reload };
    Router::new()
        .route(EVENTS_PATH, get(event_stream))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_file)
        .with_state(state)
}

async fn event_stream(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Live-reload client connected");

    let stream = BroadcastStream::new(state.reload.subscribe()).filter_map(|result| async move {
        let kind = match result {
            Ok(kind) => kind,
            // Missed events collapse into one full reload
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Live-reload client lagged by {} event(s)", skipped);
                ReloadKind::Page
            }
        };
        Some(Ok(Event::default().event(kind.event_name()).data(kind.event_name())))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_SCRIPT,
    )
}

async fn serve_file(State(state): State<ServerState>, req: Request) -> Response {
    if req.method() == Method::GET {
        if let Some(path) = resolve_html(&state.root, req.uri().path()) {
            match tokio::fs::read_to_string(&path).await {
                Ok(html) => return Html(inject_client(&html)).into_response(),
                Err(e) => debug!("Serving {} without injection: {}", path.display(), e),
            }
        }
    }

    match ServeDir::new(state.root.as_path()).oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Serve until the listener fails.
pub async fn serve(
    listener: tokio::net::TcpListener,
    root: PathBuf,
    reload: LiveReload,
) -> Result<(), ServerError> {
    axum::serve(listener, router(root, reload)).await.map_err(ServerError::Serve)
}

/// A dev server running on its own thread.
#[derive(Debug)]
pub struct DevServer {
    /// Address actually bound (resolves port 0)
    pub addr: SocketAddr,
    pub thread: JoinHandle<()>,
}

/// Bind the configured address and start serving `root` in the background.
///
/// Binding happens before this returns, so an address in use is reported
/// here rather than from the server thread.
pub fn spawn(
    config: &ServerConfig,
    root: PathBuf,
    reload: LiveReload,
) -> Result<DevServer, ServerError> {
    let addr = format!("{}:{}", config.host, config.port);
    let bind_error = |source: std::io::Error| ServerError::Bind { addr: addr.clone(), source };

    let listener = std::net::TcpListener::bind(&addr).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    let local = listener.local_addr().map_err(bind_error)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sitepipe-server")
        .build()
        .map_err(ServerError::Runtime)?;

    let thread = std::thread::Builder::new()
        .name("sitepipe-server".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!("Failed to register listener: {}", e);
                        return;
                    }
                };
                if let Err(e) = serve(listener, root, reload).await {
                    error!("{}", e);
                }
            });
        })
        .map_err(ServerError::Runtime)?;

    info!("Serving at http://{}", local);
    Ok(DevServer { addr: local, thread })
}
