use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use lazy_static::lazy_static;
use std::sync::OnceLock;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use tracing::warn;

use crate::context_engine::ContextDecision;
use crate::error::{AuthError, CredentialError};
use crate::shared_state::UnifiedAppState;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static SESSION_RESOLUTIONS: OnceLock<IntCounterVec> = OnceLock::new();
static ACTIVE_SESSIONS: OnceLock<IntGauge> = OnceLock::new();
static CONTEXT_DECISIONS: OnceLock<IntCounterVec> = OnceLock::new();
static CONTEXT_FALLBACKS: OnceLock<IntCounter> = OnceLock::new();
static LOGIN_ATTEMPTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Create and register all collectors. Safe to call more than once.
pub fn init_metrics() -> prometheus::Result<()> {
    if SESSION_RESOLUTIONS.get().is_some() {
        return Ok(());
    }

    let resolutions = IntCounterVec::new(
        prometheus::opts!("session_resolutions_total", "Session lookups by outcome"),
        &["outcome"],
    )?;
    let active_sessions = IntGauge::new("active_sessions", "Sessions currently held in memory")?;
    let decisions = IntCounterVec::new(
        prometheus::opts!("context_decisions_total", "Context decisions by query kind"),
        &["kind"],
    )?;
    let fallbacks = IntCounter::new(
        "context_fallbacks_total",
        "Context decisions that fell back to the safe default",
    )?;
    let logins = IntCounterVec::new(
        prometheus::opts!("login_attempts_total", "Login attempts by outcome"),
        &["outcome"],
    )?;

    REGISTRY.register(Box::new(resolutions.clone())).ok();
    REGISTRY.register(Box::new(active_sessions.clone())).ok();
    REGISTRY.register(Box::new(decisions.clone())).ok();
    REGISTRY.register(Box::new(fallbacks.clone())).ok();
    REGISTRY.register(Box::new(logins.clone())).ok();

    SESSION_RESOLUTIONS.set(resolutions).ok();
    ACTIVE_SESSIONS.set(active_sessions).ok();
    CONTEXT_DECISIONS.set(decisions).ok();
    CONTEXT_FALLBACKS.set(fallbacks).ok();
    LOGIN_ATTEMPTS.set(logins).ok();
    Ok(())
}

pub fn record_session_resolution(result: Result<(), AuthError>) {
    if let Some(counter) = SESSION_RESOLUTIONS.get() {
        let outcome = match result {
            Ok(()) => "ok",
            Err(e) => e.as_label(),
        };
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_login(result: Result<(), &CredentialError>) {
    if let Some(counter) = LOGIN_ATTEMPTS.get() {
        let outcome = match result {
            Ok(()) => "ok",
            Err(e) => e.as_label(),
        };
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_context_decision(decision: &ContextDecision) {
    if decision.degraded {
        if let Some(counter) = CONTEXT_FALLBACKS.get() {
            counter.inc();
        }
    }
    if let Some(counter) = CONTEXT_DECISIONS.get() {
        let kind = if decision.greeting_without_history {
            "greeting"
        } else if decision.is_followup {
            "followup"
        } else {
            "independent"
        };
        counter.with_label_values(&[kind]).inc();
    }
}

pub fn set_active_sessions(count: usize) {
    if let Some(gauge) = ACTIVE_SESSIONS.get() {
        gauge.set(count as i64);
    }
}

pub async fn get_metrics(State(state): State<UnifiedAppState>) -> impl IntoResponse {
    set_active_sessions(state.sessions().active_session_count());

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
