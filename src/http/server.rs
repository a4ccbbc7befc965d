//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (tracing, timeout, request ID, deny list)
//! - Forward admitted requests to the upstream
//! - Apply deny list changes from config reloads
//! - Stop on the shutdown broadcast

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri, Version},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GateConfig;
use crate::http::middleware::{deny_list_middleware, DenyListPolicy, DenyListState};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::observability::metrics;
use crate::security::AddressError;

/// Errors that keep the server from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("deny list: {0}")]
    DenyList(#[from] AddressError),

    #[error("invalid upstream address: {0}")]
    Upstream(String),
}

/// Application state injected into the forward handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Authority,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server fronting one upstream with the deny-list gate.
pub struct GateServer {
    router: Router,
    config: GateConfig,
    deny_list: DenyListState,
}

impl GateServer {
    /// Create a new server with the given configuration.
    ///
    /// Fails when the deny list does not build; the gate never serves
    /// without a valid one.
    pub fn new(config: GateConfig) -> Result<Self, ServerError> {
        let policy = DenyListPolicy::from_config(&config.deny_list)?;
        let deny_list = DenyListState::new(policy);

        tracing::info!(
            literals = deny_list.load().gate.address_set().literal_count(),
            ranges = deny_list.load().gate.address_set().range_count(),
            header = %config.deny_list.forwarded_header,
            "Deny list loaded"
        );

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let upstream = config
            .upstream
            .address
            .parse::<Authority>()
            .map_err(|_| ServerError::Upstream(config.upstream.address.clone()))?;

        let state = AppState { upstream, client };
        let router = Self::build_router(&config, state, deny_list.clone());

        Ok(Self {
            router,
            config,
            deny_list,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState, deny_list: DenyListState) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .layer(middleware::from_fn_with_state(deny_list, deny_list_middleware))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Deny list updates arrive on `config_updates`; the server stops when
    /// `shutdown` fires or its sender is dropped.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "Gate server starting"
        );

        let deny_list = self.deny_list.clone();
        let running = self.config.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_update(&deny_list, &running, &new_config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("Gate server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Handle to the live deny-list policy.
    pub fn deny_list(&self) -> &DenyListState {
        &self.deny_list
    }
}

/// Swap in the deny list of `new_config`; other sections need a restart.
fn apply_update(deny_list: &DenyListState, running: &GateConfig, new_config: &GateConfig) {
    match DenyListPolicy::from_config(&new_config.deny_list) {
        Ok(policy) => {
            tracing::info!(
                literals = policy.gate.address_set().literal_count(),
                ranges = policy.gate.address_set().range_count(),
                header = %new_config.deny_list.forwarded_header,
                "Deny list reloaded"
            );
            deny_list.store(policy);
            metrics::record_config_reload(true);
        }
        Err(e) => {
            tracing::error!(error = %e, "Rejected deny list update. Keeping current deny list.");
            metrics::record_config_reload(false);
            return;
        }
    }

    if new_config.listener.bind_address != running.listener.bind_address
        || new_config.upstream.address != running.upstream.address
        || new_config.timeouts.request_secs != running.timeouts.request_secs
        || new_config.timeouts.connect_secs != running.timeouts.connect_secs
    {
        tracing::warn!("Listener, upstream and timeout changes take effect after a restart");
    }
}

/// Forward an admitted request to the upstream unchanged.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(&request).to_string();
    let (mut parts, body) = request.into_parts();
    parts.version = Version::HTTP_11;

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Could not build upstream URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream_error();
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
