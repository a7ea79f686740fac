use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::routes::{self, AppState};
use crate::client::Backend;

const TRACING_TARGET: &str = "backoffice::console";

/// Stylesheet and other static files served next to the pages.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets/"]
pub struct Assets;

/// Configuration for the console server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3142,
            dev_mode: false,
        }
    }
}

/// Build the full application router: form pages plus embedded assets.
pub fn build_router(state: Arc<AppState>) -> Router {
    routes::console_router(state)
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
}

/// Serve embedded static files.
async fn static_handler(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');
    match Assets::get(path) {
        Some(content) if !path.is_empty() => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Start the console server against `backend`.
pub async fn start_server(config: ServerConfig, backend: Arc<dyn Backend>) -> Result<()> {
    let state = Arc::new(AppState::new(backend).context("Failed to register page templates")?);
    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(target: TRACING_TARGET, addr = %local_addr, dev = config.dev_mode, "console listening");
    println!("Back-office console running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: TRACING_TARGET, error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::client::{ActivityDraft, Building, Space, SpaceDraft, User};
    use crate::errors::ClientError;
    use crate::fields::editor::TemplateDraft;
    use crate::fields::{Template, TemplateKind};

    struct Offline;

    fn offline() -> ClientError {
        ClientError::Status {
            status: 503,
            path: "/".into(),
            body: String::new(),
        }
    }

    #[async_trait::async_trait]
    impl Backend for Offline {
        async fn list_templates(&self, _: TemplateKind) -> Result<Vec<Template>, ClientError> {
            Err(offline())
        }
        async fn list_spaces(&self) -> Result<Vec<Space>, ClientError> {
            Err(offline())
        }
        async fn list_buildings(&self) -> Result<Vec<Building>, ClientError> {
            Err(offline())
        }
        async fn list_users(&self) -> Result<Vec<User>, ClientError> {
            Err(offline())
        }
        async fn create_activity(&self, _: &ActivityDraft) -> Result<(), ClientError> {
            Err(offline())
        }
        async fn create_space(&self, _: &SpaceDraft) -> Result<(), ClientError> {
            Err(offline())
        }
        async fn update_space(&self, _: i64, _: &SpaceDraft) -> Result<(), ClientError> {
            Err(offline())
        }
        async fn save_template(
            &self,
            _: Option<i64>,
            _: &TemplateDraft,
        ) -> Result<(), ClientError> {
            Err(offline())
        }
        async fn delete_template(&self, _: TemplateKind, _: i64) -> Result<(), ClientError> {
            Err(offline())
        }
    }

    fn test_router() -> Router {
        build_router(Arc::new(AppState::new(Arc::new(Offline)).unwrap()))
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stylesheet_is_embedded() {
        let req = Request::builder()
            .uri("/console.css")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let req = Request::builder()
            .uri("/nope.js")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_offline_backend_still_serves_forms() {
        let req = Request::builder()
            .uri("/spaces/new")
            .body(Body::empty())
            .unwrap();
        let resp = test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3142);
        assert!(!config.dev_mode);
    }
}
