use std::net::SocketAddr;

use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::AppEnv;
use crate::db::StorageMode;
use crate::error::{ApiError, ApiResponse};
use crate::state::AppState;
use crate::{applications, auth, debug, jobs};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub storage: StorageMode,
}

async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    ApiResponse::ok(Health {
        status: "ok",
        storage: state.db.mode(),
    })
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

pub fn build_app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(auth::router())
        .merge(jobs::router())
        .merge(applications::router())
        .route("/health", get(health));
    if state.config.env == AppEnv::Development {
        api = api.merge(debug::router());
    }

    let mut app = Router::new().nest("/api", api);
    if state.config.uploads.s3.is_none() {
        app = app.nest_service("/uploads", ServeDir::new(&state.config.uploads.dir));
    }

    app.fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        let latency_ms = latency.as_millis() as u64;
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
