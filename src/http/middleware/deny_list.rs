//! Deny-list middleware.
//! Rejects requests whose client address is in the deny set.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tracing::Instrument;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::DenyListConfig;
use crate::http::request::request_id;
use crate::observability::{metrics, TracingObserver};
use crate::security::{AddressError, AddressSet, DecisionObserver, Gate};

/// The gate together with the header it reads.
#[derive(Debug)]
pub struct DenyListPolicy {
    pub gate: Gate,
    pub header: HeaderName,
}

impl DenyListPolicy {
    pub fn new(gate: Gate, header: HeaderName) -> Self {
        Self { gate, header }
    }

    /// Build a policy that reports through [`TracingObserver`].
    pub fn from_config(config: &DenyListConfig) -> Result<Self, AddressError> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        config: &DenyListConfig,
        observer: Arc<dyn DecisionObserver>,
    ) -> Result<Self, AddressError> {
        let set = AddressSet::new(&config.ips)?;
        // Invalid names are rejected by config validation.
        let header = HeaderName::from_bytes(config.forwarded_header.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static(crate::security::X_FORWARDED_FOR));
        Ok(Self::new(Gate::new(set, observer), header))
    }

    /// All values of the proxy-chain header joined with commas.
    ///
    /// Values that are not visible ASCII are skipped.
    pub fn forwarded_for(&self, headers: &HeaderMap) -> Option<String> {
        let values: Vec<&str> = headers
            .get_all(&self.header)
            .iter()
            .filter_map(|v| match v.to_str() {
                Ok(s) => Some(s),
                Err(_) => {
                    tracing::debug!(header = %self.header, "Ignoring non-ASCII header value");
                    None
                }
            })
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }
}

/// Shared, hot-swappable deny-list policy.
#[derive(Clone)]
pub struct DenyListState {
    policy: Arc<ArcSwap<DenyListPolicy>>,
}

impl DenyListState {
    pub fn new(policy: DenyListPolicy) -> Self {
        Self {
            policy: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    pub fn load(&self) -> Arc<DenyListPolicy> {
        self.policy.load_full()
    }

    /// Replace the policy; requests already evaluating keep the old one.
    pub fn store(&self, policy: DenyListPolicy) {
        self.policy.store(Arc::new(policy));
    }
}

pub async fn deny_list_middleware(
    State(state): State<DenyListState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let policy = state.load();
    let forwarded_for = policy.forwarded_for(request.headers());
    let peer = peer.to_string();
    let span = tracing::info_span!("deny_list", request_id = %request_id(&request), peer = %peer);

    let forwarded = policy
        .gate
        .guard(forwarded_for.as_deref(), &peer, move || {
            metrics::record_decision(false, start);
            next.run(request)
        })
        .instrument(span)
        .await;

    match forwarded {
        Some(response) => response,
        None => {
            metrics::record_decision(true, start);
            StatusCode::FORBIDDEN.into_response()
        }
    }
}
