use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::sitemap::{FeedService, FEED_PATH};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Build the HTTP router exposing the news sitemap.
pub fn build_router(service: Arc<FeedService>) -> Router {
    Router::new()
        .route(FEED_PATH, get(feed_handler))
        .with_state(service)
}

async fn feed_handler(State(service): State<Arc<FeedService>>) -> Response {
    match service.get().await {
        Ok(document) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            document,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to serve news sitemap: {}", e);
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "News sitemap is temporarily unavailable",
            )
                .into_response()
        }
    }
}

/// Bind `addr` and serve `router` until Ctrl-C.
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("Serving news sitemap on http://{}{}", local, FEED_PATH);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::Io)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
