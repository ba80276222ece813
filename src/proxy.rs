//! Same-origin image proxy so avatars can be drawn without tainting the
//! badge surface.

use crate::config::ProxyConfig;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const PROXY_PATH: &str = "/api/proxy-image";

#[derive(Clone)]
struct ProxyState {
    client: reqwest::Client,
    config: Arc<ProxyConfig>,
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    url: Option<String>,
}

pub fn router(config: ProxyConfig, client: reqwest::Client) -> Router {
    Router::new()
        .route(PROXY_PATH, get(proxy_image))
        .with_state(ProxyState {
            client,
            config: Arc::new(config),
        })
}

async fn proxy_image(
    State(state): State<ProxyState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(url) = params.url.filter(|url| !url.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("Error: Image URL parameter is missing. Use {PROXY_PATH}?url=YOUR_IMAGE_URL"),
        )
            .into_response();
    };

    if !url.starts_with(&state.config.allowed_prefix) {
        warn!(%url, "refusing to proxy url outside the allowed prefix");
        return (
            StatusCode::FORBIDDEN,
            format!(
                "Forbidden: Only {} images can be proxied.",
                state.config.allowed_prefix
            ),
        )
            .into_response();
    }

    let upstream = match state.client.get(&url).send().await {
        Ok(upstream) => upstream,
        Err(err) => {
            error!(%url, error = %err, "proxy fetch failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Proxy error when fetching image.",
            )
                .into_response();
        }
    };

    let status = upstream.status();
    if !status.is_success() {
        warn!(%url, %status, "upstream refused image");
        let reason = status.canonical_reason().unwrap_or("upstream error");
        return (status, format!("Failed to fetch image: {reason}")).into_response();
    }

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(err) => {
            error!(%url, error = %err, "proxy body read failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Proxy error when fetching image.",
            )
                .into_response();
        }
    };

    let mut response = body.into_response();
    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    } else {
        headers.remove(header::CONTENT_TYPE);
    }
    if let Ok(cache) = HeaderValue::from_str(&state.config.cache_control) {
        headers.insert(header::CACHE_CONTROL, cache);
    }
    response
}

/// Serves the proxy on `listener` until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    config: ProxyConfig,
    client: reqwest::Client,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(config, client);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Binds `config.bind` and serves until ctrl-c or SIGTERM.
pub async fn serve(config: ProxyConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    info!(address = %listener.local_addr()?, "image proxy listening");
    serve_on(listener, config, reqwest::Client::new(), shutdown_signal()).await?;
    info!("image proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
