use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;

/// Prune the attempt map once it grows past this many keys.
const CLEANUP_THRESHOLD: usize = 100;

/// Sliding-window request counter keyed by client identity. Built once in
/// the composition root and passed into the middleware via state.
#[derive(Clone)]
pub struct RateLimitState {
    attempts: Arc<DashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitState {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Admit or reject one request for `key`, recording it when admitted.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let window_start = now - self.window;

        let mut attempts = self.attempts.entry(key.to_string()).or_default();
        attempts.retain(|&t| t > window_start);

        if attempts.len() < self.max_requests as usize {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Drop entries with no attempts inside the last two windows.
    pub fn cleanup(&self) {
        let cutoff = Instant::now() - self.window * 2;
        self.attempts.retain(|_, attempts| {
            attempts.retain(|&t| t > cutoff);
            !attempts.is_empty()
        });
    }

    fn maybe_cleanup(&self) {
        if self.attempts.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }
    }
}

/// Client identity for limiting: proxy headers first, then the peer
/// address recorded by `into_make_service_with_connect_info`. `None`
/// means the request cannot be attributed to a client at all.
fn client_key(req: &Request) -> Option<String> {
    let from_headers = req
        .headers()
        .get("x-forwarded-for")
        .or_else(|| req.headers().get("x-real-ip"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());
    if let Some(key) = from_headers {
        return Some(key);
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

pub async fn rate_limit(
    State(state): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    // Unattributable requests are not limited; a shared bucket would let
    // one client exhaust the budget for everyone.
    let Some(key) = client_key(&req) else {
        return next.run(req).await;
    };

    if !state.allow(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }

    state.maybe_cleanup();

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn direct_request(peer: &str) -> Request {
        let mut req = Request::new(Body::empty());
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>(peer.parse().unwrap()));
        req
    }

    #[tokio::test]
    async fn admits_up_to_limit() {
        let state = RateLimitState::new(3, 60);
        let key = "192.168.1.1";

        assert!(state.allow(key));
        assert!(state.allow(key));
        assert!(state.allow(key));
        assert!(!state.allow(key));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let state = RateLimitState::new(1, 60);
        assert!(state.allow("10.0.0.1"));
        assert!(!state.allow("10.0.0.1"));
        assert!(state.allow("10.0.0.2"));
    }

    #[tokio::test]
    async fn readmits_after_window() {
        let state = RateLimitState::new(2, 1);
        let key = "192.168.1.1";

        assert!(state.allow(key));
        assert!(state.allow(key));
        assert!(!state.allow(key));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(state.allow(key));
    }

    #[test]
    fn proxy_headers_take_precedence() {
        let mut req = direct_request("10.0.0.1:5000");
        req.headers_mut()
            .insert("x-forwarded-for", "1.2.3.4, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&req).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn direct_clients_have_independent_budgets() {
        let state = RateLimitState::new(1, 60);
        let first = client_key(&direct_request("1.2.3.4:40001")).unwrap();
        let second = client_key(&direct_request("5.6.7.8:40002")).unwrap();

        assert_ne!(first, second);
        assert!(state.allow(&first));
        assert!(state.allow(&second));
        assert!(!state.allow(&first));
    }

    #[test]
    fn unattributable_request_has_no_key() {
        let req = Request::new(Body::empty());
        assert_eq!(client_key(&req), None);
    }

    #[test]
    fn stale_map_is_pruned_past_threshold() {
        let state = RateLimitState::new(1, 1);
        for i in 0..150 {
            assert!(state.allow(&format!("10.0.{}.{}", i / 256, i % 256)));
        }
        let stale = Instant::now() - Duration::from_secs(10);
        for mut entry in state.attempts.iter_mut() {
            entry.value_mut()[0] = stale;
        }

        // 150 is not a multiple of anything special; the size threshold
        // alone must trigger the prune.
        state.maybe_cleanup();
        assert!(state.attempts.is_empty());
    }

    #[tokio::test]
    async fn cleanup_drops_stale_entries() {
        let state = RateLimitState::new(1, 1);
        assert!(state.allow("stale"));
        assert!(state.allow("fresh"));

        if let Some(mut attempts) = state.attempts.get_mut("stale") {
            attempts[0] = Instant::now() - Duration::from_secs(10);
        }
        state.cleanup();

        assert!(!state.attempts.contains_key("stale"));
        assert!(state.attempts.contains_key("fresh"));
    }
}
