use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use mesa_core::Company;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    /// One trial request is let through after the reset timeout; others are refused until it settles.
    HalfOpen,
}

/// Consecutive-failure breaker for one company's upstream.
pub struct CircuitBreaker {
    pub name: String,
    pub state: RwLock<CircuitState>,
    pub failure_count: AtomicUsize,
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
    /// When the breaker last opened or admitted a trial request.
    pub opened_at: RwLock<Option<Instant>>,
    trial_in_flight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout: timeout,
            opened_at: RwLock::new(None),
            trial_in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a request may go through now.
    pub async fn check(&self) -> bool {
        let mut state = self.state.write().await;
        match *state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if self
                    .trial_in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return true;
                }

                // A trial request that never reported back is replaced after another timeout.
                let mut since = self.opened_at.write().await;
                let abandoned = (*since).map_or(true, |t| t.elapsed() > self.reset_timeout);
                if abandoned {
                    *since = Some(Instant::now());
                }
                abandoned
            }
            CircuitState::Open => {
                let mut since = self.opened_at.write().await;
                let cooled_down = (*since).map_or(false, |t| t.elapsed() > self.reset_timeout);

                if cooled_down {
                    *state = CircuitState::HalfOpen;
                    *since = Some(Instant::now());
                    self.trial_in_flight.store(true, Ordering::SeqCst);
                    tracing::info!(breaker = %self.name, "Circuit half-open, trying upstream");
                }
                cooled_down
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        self.failure_count.store(0, Ordering::SeqCst);
        self.trial_in_flight.store(false, Ordering::SeqCst);
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            tracing::info!(breaker = %self.name, "Circuit closed, upstream recovered");
        }
    }

    pub async fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;
        self.trial_in_flight.store(false, Ordering::SeqCst);

        if failures >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            *self.opened_at.write().await = Some(Instant::now());
            tracing::error!(breaker = %self.name, failures, "Circuit opened");
        }
    }
}

/// Breakers keyed by company and upstream, created on first use.
pub struct CircuitBreakers {
    failure_threshold: usize,
    reset_timeout: Duration,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakers {
    pub fn new(failure_threshold: usize, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(cb) = self.breakers.read().await.get(name) {
            return cb.clone();
        }

        let mut breakers = self.breakers.write().await;
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(name, self.failure_threshold, self.reset_timeout))
            })
            .clone()
    }
}

/// Guards routes that call a company's back office or the date oracle.
/// Runs after API-key auth, which puts the [`Company`] in the request extensions.
pub async fn circuit_breaker_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(company_id) = req.extensions().get::<Company>().map(|c| c.id) else {
        return next.run(req).await;
    };

    let upstream = if req.uri().path().ends_with("/fecha-lenguaje-humano") {
        "date-oracle"
    } else {
        "backoffice"
    };
    let cb = state.resiliency.get(&format!("{}:{}", upstream, company_id)).await;

    if !cb.check().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": format!("Circuit Breaker [{}] is OPEN", cb.name) })),
        )
            .into_response();
    }

    let response = next.run(req).await;

    if response.status().is_server_error() {
        cb.record_failure().await;
    } else {
        cb.record_success().await;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trips_after_threshold_and_recovers() {
        let cb = CircuitBreaker::new("backoffice:1", 2, Duration::from_millis(20));

        cb.record_failure().await;
        assert!(cb.check().await);
        cb.record_failure().await;
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert_eq!(*cb.state.read().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(*cb.state.read().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_admits_single_request() {
        let cb = CircuitBreaker::new("date-oracle:1", 1, Duration::from_millis(20));

        cb.record_failure().await;
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert!(!cb.check().await);
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await, "unanswered trial is replaced");
        assert!(!cb.check().await);

        cb.record_failure().await;
        assert_eq!(*cb.state.read().await, CircuitState::Open);
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        cb.record_success().await;
        assert!(cb.check().await);
        assert!(cb.check().await);
    }

    #[tokio::test]
    async fn test_registry_reuses_breaker_per_key() {
        let breakers = CircuitBreakers::new(3, Duration::from_secs(1));

        let a = breakers.get("backoffice:1").await;
        let b = breakers.get("backoffice:1").await;
        let c = breakers.get("backoffice:2").await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
