//! Login rate limiting using the token bucket algorithm
//!
//! Buckets are keyed by client address and route so one noisy client cannot
//! lock everyone else out of the login form. Second-factor attempts are also
//! counted per account.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use plenario_common::{config::RateLimitConfig, errors::AppError};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::AppState;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client limiter for the credential routes
pub struct LoginRateLimiter {
    limiter: Option<KeyedLimiter>,
    trust_forwarded: bool,
}

impl LoginRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = config.enabled.then(|| {
            let per_minute = NonZeroU32::new(config.login_per_minute).unwrap_or(NonZeroU32::MIN);
            let burst = NonZeroU32::new(config.burst).unwrap_or(per_minute);
            RateLimiter::keyed(Quota::per_minute(per_minute).allow_burst(burst))
        });
        Self {
            limiter,
            trust_forwarded: config.trust_forwarded,
        }
    }

    /// Whether `key` may attempt again now
    pub fn check(&self, key: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&key.to_string()).is_ok(),
            None => true,
        }
    }

    /// Second-factor attempts against one account, from any address
    pub fn check_account(&self, usuario_id: Uuid) -> bool {
        self.check(&format!("2fa:{}", usuario_id))
    }

    /// Bucket for a request: route plus client address
    pub fn key_for(&self, request: &Request) -> String {
        format!("{}|{}", request.uri().path(), client_key(request, self.trust_forwarded))
    }

    /// Drop idle buckets
    pub fn shrink(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }
}

/// Peer address; forwarded headers count only when `trust_forwarded` is set
pub fn client_key(request: &Request, trust_forwarded: bool) -> String {
    let headers = request.headers();
    let forwarded = trust_forwarded
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .flatten();

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = state.login_limiter.key_for(&request);
    if state.login_limiter.check(&key) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(client = %key, "Login rate limit exceeded");
        Err(AppError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn config(per_minute: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            login_per_minute: per_minute,
            burst,
            enabled: true,
            trust_forwarded: false,
        }
    }

    #[test]
    fn test_burst_then_blocked() {
        let limiter = LoginRateLimiter::new(&config(1, 2));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        // other clients have their own bucket
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_disabled_never_blocks() {
        let mut cfg = config(1, 1);
        cfg.enabled = false;
        let limiter = LoginRateLimiter::new(&cfg);
        for _ in 0..10 {
            assert!(limiter.check("10.0.0.1"));
        }
    }

    fn from_peer(peer: [u8; 4], forwarded: &str) -> Request {
        let mut request = Request::builder()
            .uri("/api/auth/login")
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 51000))));
        request
    }

    #[test]
    fn test_client_key() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request, false), "unknown");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 51000))));
        assert_eq!(client_key(&request, false), "192.0.2.10");
    }

    #[test]
    fn test_forwarded_header_ignored_unless_trusted() {
        let request = from_peer([10, 0, 0, 1], "203.0.113.7, 10.0.0.1");
        assert_eq!(client_key(&request, false), "10.0.0.1");
        assert_eq!(client_key(&request, true), "203.0.113.7");
    }

    #[test]
    fn test_rotating_forwarded_header_shares_one_bucket() {
        let limiter = LoginRateLimiter::new(&config(1, 1));
        let allowed = (0..50)
            .map(|i| from_peer([203, 0, 113, 5], &format!("198.51.100.{}", i)))
            .filter(|request| limiter.check(&limiter.key_for(request)))
            .count();
        assert_eq!(allowed, 1);
    }

    #[test]
    fn test_routes_and_accounts_have_separate_buckets() {
        let limiter = LoginRateLimiter::new(&config(1, 1));
        let login = from_peer([203, 0, 113, 5], "");
        let mut verify = from_peer([203, 0, 113, 5], "");
        *verify.uri_mut() = "/api/auth/2fa/verify".parse().unwrap();

        assert!(limiter.check(&limiter.key_for(&login)));
        assert!(!limiter.check(&limiter.key_for(&login)));
        assert!(limiter.check(&limiter.key_for(&verify)));

        let usuario = Uuid::new_v4();
        assert!(limiter.check_account(usuario));
        assert!(!limiter.check_account(usuario));
        assert!(limiter.check_account(Uuid::new_v4()));
    }
}
