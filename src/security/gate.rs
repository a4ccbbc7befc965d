//! Allow/deny decision over resolved candidates.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::security::address_set::{AddressError, AddressSet};
use crate::security::client_ip;

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny { address: String },
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        matches!(self, Decision::Deny { .. })
    }
}

/// Receives the gate's side-channel events.
pub trait DecisionObserver: Send + Sync {
    /// A candidate could not be parsed and was skipped.
    fn invalid_candidate(&self, candidate: &str, error: &AddressError);

    /// A candidate matched the deny set.
    fn denied(&self, address: &str);
}

/// The request gate: a deny set plus the observer it reports to.
#[derive(Clone)]
pub struct Gate {
    set: Arc<AddressSet>,
    observer: Arc<dyn DecisionObserver>,
}

impl Gate {
    pub fn new(set: AddressSet, observer: Arc<dyn DecisionObserver>) -> Self {
        Self {
            set: Arc::new(set),
            observer,
        }
    }

    pub fn address_set(&self) -> &AddressSet {
        &self.set
    }

    /// Evaluate candidates in order; the first match denies.
    ///
    /// Unparseable candidates are reported and skipped.
    pub fn decide<S: AsRef<str>>(&self, candidates: &[S]) -> Decision {
        for candidate in candidates {
            let candidate = candidate.as_ref();
            match self.set.contains(candidate) {
                Ok(true) => {
                    self.observer.denied(candidate);
                    return Decision::Deny {
                        address: candidate.to_string(),
                    };
                }
                Ok(false) => {}
                Err(e) => self.observer.invalid_candidate(candidate, &e),
            }
        }

        Decision::Allow
    }

    /// Resolve the request's candidates and decide.
    pub fn evaluate(&self, forwarded_for: Option<&str>, peer: &str) -> Decision {
        let candidates = client_ip::resolve(forwarded_for, peer);
        self.decide(&candidates)
    }

    /// Run `forward` only when the request is allowed.
    ///
    /// Returns `None` on denial; the caller answers 403 without forwarding.
    pub async fn guard<F, Fut, R>(
        &self,
        forwarded_for: Option<&str>,
        peer: &str,
        forward: F,
    ) -> Option<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        match self.evaluate(forwarded_for, peer) {
            Decision::Allow => Some(forward().await),
            Decision::Deny { .. } => None,
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").field("set", &self.set).finish_non_exhaustive()
    }
}
